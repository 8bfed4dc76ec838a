//! Message assembly.
//!
//! Responsibilities:
//! - Own the encoder configuration (delimiters, segment terminator, target time zone)
//! - Sequence segments for each supported (message type, trigger event) pair
//! - Fail the whole message if any segment fails; there is no partial output
//!
//! Supported messages:
//! - ADT A01–A05, A08–A17, A23, A25–A28, A31, A34, A40
//! - ORM^O01, ORR^O02, ORU^R01/R03/R32, MDM^T02

use crate::encoding::{Delimiters, DEFAULT_SEGMENT_TERMINATOR};
use crate::model::{Document, HeaderInfo, Order, PatientInfo};
use crate::{Hl7Error, Hl7Result};
use chrono::{DateTime, TimeZone, Utc};
use labsim_types::NullTime;
use std::fmt::{self, Display};

// ============================================================================
// Public message types
// ============================================================================

/// Message type and trigger event, for example `ORU^R01`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageType {
    pub message_type: &'static str,
    pub trigger_event: &'static str,
}

impl MessageType {
    pub const fn new(message_type: &'static str, trigger_event: &'static str) -> Self {
        Self {
            message_type,
            trigger_event,
        }
    }
}

impl Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}^{}", self.message_type, self.trigger_event)
    }
}

/// A rendered message and the type it was rendered as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hl7Message {
    pub message_type: MessageType,
    pub message: String,
}

/// ADT trigger events.
///
/// Events that need more than the patient carry it in the variant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AdtEvent<'a> {
    /// A01
    Admission,
    /// A02
    Transfer,
    /// A03
    Discharge,
    /// A04
    Registration,
    /// A05
    PreAdmit,
    /// A08
    UpdatePatient,
    /// A09
    TrackDeparture,
    /// A10
    TrackArrival,
    /// A11
    CancelVisit,
    /// A12
    CancelTransfer,
    /// A13
    CancelDischarge,
    /// A14
    PendingAdmission,
    /// A15
    PendingTransfer,
    /// A16
    PendingDischarge,
    /// A17: the patient swaps beds with `other`.
    BedSwap { other: &'a PatientInfo },
    /// A23
    DeleteVisit,
    /// A25
    CancelPendingDischarge,
    /// A26
    CancelPendingTransfer,
    /// A27
    CancelPendingAdmit,
    /// A28
    AddPerson,
    /// A31
    UpdatePerson,
    /// A34: merge the patient with one other MRN.
    MergePatientId { with_mrn: &'a str },
    /// A40: merge the patient with a list of MRNs.
    MergePatients { with_mrns: &'a [String] },
}

impl AdtEvent<'_> {
    /// Returns the HL7 trigger event code.
    pub fn trigger_event(&self) -> &'static str {
        match self {
            Self::Admission => "A01",
            Self::Transfer => "A02",
            Self::Discharge => "A03",
            Self::Registration => "A04",
            Self::PreAdmit => "A05",
            Self::UpdatePatient => "A08",
            Self::TrackDeparture => "A09",
            Self::TrackArrival => "A10",
            Self::CancelVisit => "A11",
            Self::CancelTransfer => "A12",
            Self::CancelDischarge => "A13",
            Self::PendingAdmission => "A14",
            Self::PendingTransfer => "A15",
            Self::PendingDischarge => "A16",
            Self::BedSwap { .. } => "A17",
            Self::DeleteVisit => "A23",
            Self::CancelPendingDischarge => "A25",
            Self::CancelPendingTransfer => "A26",
            Self::CancelPendingAdmit => "A27",
            Self::AddPerson => "A28",
            Self::UpdatePerson => "A31",
            Self::MergePatientId { .. } => "A34",
            Self::MergePatients { .. } => "A40",
        }
    }

    /// Returns the (planned, occurred) times sent in EVN-3 and EVN-6.
    fn event_times(&self, p: &PatientInfo) -> (NullTime, NullTime) {
        let none = NullTime::invalid();
        match self {
            Self::PreAdmit | Self::PendingAdmission => (p.expected_admit_date_time, none),
            Self::PendingTransfer => (p.expected_transfer_date_time, none),
            Self::PendingDischarge => (p.expected_discharge_date_time, none),
            Self::CancelVisit => (none, p.admission_date),
            Self::CancelTransfer => (none, p.transfer_date),
            Self::CancelDischarge => (none, p.discharge_date),
            Self::CancelPendingDischarge => (none, p.expected_discharge_date_time),
            Self::CancelPendingTransfer => (none, p.expected_transfer_date_time),
            Self::CancelPendingAdmit => (none, p.expected_admit_date_time),
            _ => (none, none),
        }
    }
}

/// ORU trigger events. All three share one segment layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultTrigger {
    R01,
    R03,
    R32,
}

impl ResultTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::R01 => "R01",
            Self::R03 => "R03",
            Self::R32 => "R32",
        }
    }
}

// ============================================================================
// Encoder
// ============================================================================

/// Renders domain objects as HL7v2 messages.
///
/// The encoder holds only configuration and can be shared between threads when `Tz` allows it.
#[derive(Clone, Debug)]
pub struct Hl7Encoder<Tz: TimeZone> {
    pub(crate) delimiters: Delimiters,
    pub(crate) segment_terminator: String,
    pub(crate) tz: Tz,
}

impl<Tz> Hl7Encoder<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    /// Creates an encoder rendering dates in `tz` with the default delimiters.
    pub fn new(tz: Tz) -> Self {
        Self {
            delimiters: Delimiters::default(),
            segment_terminator: DEFAULT_SEGMENT_TERMINATOR.to_string(),
            tz,
        }
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    pub fn with_segment_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.segment_terminator = terminator.into();
        self
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    pub fn segment_terminator(&self) -> &str {
        &self.segment_terminator
    }

    /// Builds an ADT message.
    ///
    /// # Arguments
    ///
    /// * `header` - Routing metadata for MSH.
    /// * `patient` - The patient and visit the event is about.
    /// * `event` - The trigger event, with any event-specific data.
    /// * `event_time` - Sent in EVN-2.
    /// * `msg_time` - Sent in MSH-7.
    ///
    /// # Errors
    ///
    /// Returns [`Hl7Error::Segment`] naming the first segment that failed to render.
    pub fn build_adt(
        &self,
        header: &HeaderInfo,
        patient: &PatientInfo,
        event: &AdtEvent<'_>,
        event_time: &DateTime<Utc>,
        msg_time: &DateTime<Utc>,
    ) -> Hl7Result<Hl7Message> {
        let message_type = MessageType::new("ADT", event.trigger_event());
        let (planned, occurred) = event.event_times(patient);

        let mut segments = Segments::default();
        segments.push_ok(self.msh(msg_time, &message_type, header));
        segments.push(
            "EVN",
            self.evn(
                event_time,
                &message_type,
                &planned,
                patient.attending_doctor.as_ref(),
                &occurred,
            ),
        )?;
        segments.push("PID", self.pid(&patient.person))?;

        match event {
            AdtEvent::Admission | AdtEvent::Registration => {
                segments.push_ok(self.pd1(patient));
                segments.push("PV1", self.pv1(patient))?;
                self.push_nk1s(&mut segments, patient);
                self.push_al1s(&mut segments, patient)?;
            }
            AdtEvent::Discharge => {
                segments.push_ok(self.pd1(patient));
                segments.push("PV1", self.pv1(patient))?;
                self.push_al1s(&mut segments, patient)?;
            }
            AdtEvent::PreAdmit => {
                segments.push_ok(self.pd1(patient));
                segments.push("PV1", self.pv1(patient))?;
                segments.push("PV2", self.pv2(patient))?;
                self.push_al1s(&mut segments, patient)?;
                self.push_nk1s(&mut segments, patient);
                self.push_dg1s(&mut segments, patient)?;
            }
            AdtEvent::UpdatePatient | AdtEvent::UpdatePerson => {
                segments.push_ok(self.pseudo_pv1());
                self.push_al1s(&mut segments, patient)?;
                self.push_dg1s(&mut segments, patient)?;
                self.push_pr1s(&mut segments, patient)?;
            }
            AdtEvent::AddPerson => {
                segments.push_ok(self.pd1(patient));
                segments.push_ok(self.pseudo_pv1());
                self.push_al1s(&mut segments, patient)?;
            }
            AdtEvent::Transfer
            | AdtEvent::TrackDeparture
            | AdtEvent::TrackArrival
            | AdtEvent::CancelVisit
            | AdtEvent::CancelTransfer
            | AdtEvent::CancelDischarge
            | AdtEvent::PendingTransfer => {
                segments.push_ok(self.pd1(patient));
                segments.push("PV1", self.pv1(patient))?;
            }
            AdtEvent::PendingAdmission
            | AdtEvent::PendingDischarge
            | AdtEvent::CancelPendingDischarge
            | AdtEvent::CancelPendingTransfer
            | AdtEvent::CancelPendingAdmit => {
                segments.push_ok(self.pd1(patient));
                segments.push("PV1", self.pv1(patient))?;
                segments.push("PV2", self.pv2(patient))?;
            }
            AdtEvent::BedSwap { other } => {
                let pd1 = self.pd1(patient);
                segments.push_ok(pd1.clone());
                segments.push("PV1", self.pv1(patient))?;
                segments.push("PID", self.pid(&other.person))?;
                // The second patient repeats the first patient's PD1.
                segments.push_ok(pd1);
                segments.push("PV1", self.pv1(other))?;
            }
            AdtEvent::DeleteVisit => {
                segments.push("PV1", self.pv1(patient))?;
            }
            AdtEvent::MergePatientId { with_mrn } => {
                segments.push_ok(self.pd1(patient));
                segments.push_ok(self.mrg(&[(*with_mrn).to_string()]));
            }
            AdtEvent::MergePatients { with_mrns } => {
                segments.push_ok(self.pd1(patient));
                segments.push_ok(self.mrg(with_mrns));
                segments.push("PV1", self.pv1(patient))?;
            }
        }

        Ok(self.finish(message_type, segments))
    }

    /// Builds an ORU message with the lab results or clinical note of `order`.
    ///
    /// OBX set IDs for lab results continue after `order.number_of_previous_results`, so
    /// amendments never reuse an ID already sent for the same order.
    pub fn build_result(
        &self,
        header: &HeaderInfo,
        patient: &PatientInfo,
        order: &Order,
        trigger: ResultTrigger,
        msg_time: &DateTime<Utc>,
    ) -> Hl7Result<Hl7Message> {
        let message_type = MessageType::new("ORU", trigger.as_str());

        let mut segments = Segments::default();
        segments.push_ok(self.msh(msg_time, &message_type, header));
        segments.push("PID", self.pid(&patient.person))?;
        segments.push("PV1", self.pv1(patient))?;
        segments.push("ORC", self.orc(order))?;
        segments.push("OBR", self.obr(order))?;

        if order.is_clinical_document() {
            for result in &order.results {
                let note = result.clinical_note.as_ref().ok_or_else(|| {
                    Hl7Error::segment(
                        "OBX",
                        Hl7Error::InvalidInput(
                            "every result of a clinical document order must carry a note".into(),
                        ),
                    )
                })?;
                for (idx, content) in note.contents.iter().enumerate() {
                    segments.push(
                        "OBX",
                        self.obx_clinical_note(idx + 1, result, content, order),
                    )?;
                }
            }
        } else {
            for (idx, result) in order.results.iter().enumerate() {
                let set_id = order.number_of_previous_results + idx + 1;
                segments.push("OBX", self.obx(set_id, result))?;
                for (note_id, note) in result.notes.iter().enumerate() {
                    segments.push_ok(self.nte(note_id, note));
                }
            }
        }

        Ok(self.finish(message_type, segments))
    }

    /// Builds an ORM^O01 order message.
    pub fn build_order(
        &self,
        header: &HeaderInfo,
        patient: &PatientInfo,
        order: &Order,
        msg_time: &DateTime<Utc>,
    ) -> Hl7Result<Hl7Message> {
        let message_type = MessageType::new("ORM", "O01");

        let mut segments = Segments::default();
        segments.push_ok(self.msh(msg_time, &message_type, header));
        segments.push("PID", self.pid(&patient.person))?;
        segments.push("PV1", self.pv1(patient))?;
        segments.push("ORC", self.orc(order))?;
        segments.push("OBR", self.obr(order))?;
        for (note_id, note) in order.notes_for_orm.iter().enumerate() {
            segments.push_ok(self.nte(note_id, note));
        }
        for (idx, result) in order.results_for_orm.iter().enumerate() {
            segments.push("OBX", self.obx(idx + 1, result))?;
            for (note_id, note) in result.notes.iter().enumerate() {
                segments.push_ok(self.nte(note_id, note));
            }
        }

        Ok(self.finish(message_type, segments))
    }

    /// Builds an ORR^O02 response acknowledging the message that placed `order`.
    pub fn build_order_response(
        &self,
        header: &HeaderInfo,
        patient: &PatientInfo,
        order: &Order,
        msg_time: &DateTime<Utc>,
    ) -> Hl7Result<Hl7Message> {
        let message_type = MessageType::new("ORR", "O02");

        let mut segments = Segments::default();
        segments.push_ok(self.msh(msg_time, &message_type, header));
        segments.push_ok(self.msa(&order.message_control_id_original_order));
        segments.push("PID", self.pid(&patient.person))?;
        segments.push("ORC", self.orc(order))?;

        Ok(self.finish(message_type, segments))
    }

    /// Builds an MDM^T02 document notification with one OBX per content line.
    pub fn build_document(
        &self,
        header: &HeaderInfo,
        patient: &PatientInfo,
        document: &Document,
        event_time: &DateTime<Utc>,
        msg_time: &DateTime<Utc>,
    ) -> Hl7Result<Hl7Message> {
        let message_type = MessageType::new("MDM", "T02");
        let none = NullTime::invalid();

        let mut segments = Segments::default();
        segments.push_ok(self.msh(msg_time, &message_type, header));
        segments.push(
            "EVN",
            self.evn(
                event_time,
                &message_type,
                &none,
                patient.attending_doctor.as_ref(),
                &none,
            ),
        )?;
        segments.push("PID", self.pid(&patient.person))?;
        segments.push("PV1", self.pv1(patient))?;
        segments.push("TXA", self.txa(patient, document))?;
        for (idx, line) in document.content_line.iter().enumerate() {
            segments.push_ok(self.obx_for_mdm(
                idx + 1,
                document.observation_identifier.as_ref(),
                line,
            ));
        }

        Ok(self.finish(message_type, segments))
    }

    fn push_nk1s(&self, segments: &mut Segments, patient: &PatientInfo) {
        for (id, party) in patient.associated_parties.iter().enumerate() {
            segments.push_ok(self.nk1(id, party));
        }
    }

    fn push_al1s(&self, segments: &mut Segments, patient: &PatientInfo) -> Hl7Result<()> {
        for (id, allergy) in patient.allergies.iter().enumerate() {
            segments.push("AL1", self.al1(id, allergy))?;
        }
        Ok(())
    }

    fn push_dg1s(&self, segments: &mut Segments, patient: &PatientInfo) -> Hl7Result<()> {
        for (id, diagnosis) in patient.diagnoses.iter().enumerate() {
            segments.push("DG1", self.dg1(id, diagnosis))?;
        }
        Ok(())
    }

    fn push_pr1s(&self, segments: &mut Segments, patient: &PatientInfo) -> Hl7Result<()> {
        for (id, procedure) in patient.procedures.iter().enumerate() {
            segments.push("PR1", self.pr1(id, procedure))?;
        }
        Ok(())
    }

    fn finish(&self, message_type: MessageType, segments: Segments) -> Hl7Message {
        tracing::debug!(
            message_type = %message_type,
            segments = segments.0.len(),
            "built HL7 message"
        );
        Hl7Message {
            message_type,
            message: segments.0.join(self.segment_terminator.as_str()),
        }
    }
}

// ============================================================================
// Helper types (internal)
// ============================================================================

/// Ordered segments of a message under construction.
#[derive(Default)]
struct Segments(Vec<String>);

impl Segments {
    fn push(&mut self, name: &'static str, segment: Hl7Result<String>) -> Hl7Result<()> {
        self.0.push(segment.map_err(|e| Hl7Error::segment(name, e))?);
        Ok(())
    }

    fn push_ok(&mut self, segment: String) {
        self.0.push(segment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Allergy, AssociatedParty, ClinicalNote, ClinicalNoteContent, DiagnosisOrProcedure,
        LabResult, Person, ValueType,
    };
    use chrono::FixedOffset;
    use labsim_types::CodedElement;

    fn encoder() -> Hl7Encoder<Utc> {
        Hl7Encoder::new(Utc)
    }

    fn t(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 2, 12, h, 0, 0)
            .single()
            .expect("valid date")
    }

    fn header() -> HeaderInfo {
        HeaderInfo {
            sending_application: "SIMHOSP".into(),
            sending_facility: "SFAC".into(),
            receiving_application: "RAPP".into(),
            receiving_facility: "RFAC".into(),
            message_control_id: "123".into(),
        }
    }

    fn patient() -> PatientInfo {
        PatientInfo {
            person: Person {
                first_name: "John".into(),
                surname: "Smith".into(),
                mrn: "MRN1".into(),
                ..Person::default()
            },
            class: "INPATIENT".into(),
            associated_parties: vec![AssociatedParty::default(), AssociatedParty::default()],
            allergies: vec![Allergy::default()],
            diagnoses: vec![DiagnosisOrProcedure::default()],
            procedures: vec![DiagnosisOrProcedure::default()],
            ..PatientInfo::default()
        }
    }

    fn segment_names(message: &Hl7Message) -> Vec<String> {
        message
            .message
            .split('\r')
            .map(|s| s.split('|').next().unwrap_or_default().to_string())
            .collect()
    }

    fn adt(event: AdtEvent<'_>) -> Vec<String> {
        let msg = encoder()
            .build_adt(&header(), &patient(), &event, &t(10), &t(11))
            .expect("build adt");
        assert_eq!(msg.message_type.trigger_event, event.trigger_event());
        segment_names(&msg)
    }

    #[test]
    fn message_type_displays_with_component_separator() {
        assert_eq!(MessageType::new("ORU", "R01").to_string(), "ORU^R01");
    }

    #[test]
    fn adt_segment_order() {
        assert_eq!(
            adt(AdtEvent::Admission),
            ["MSH", "EVN", "PID", "PD1", "PV1", "NK1", "NK1", "AL1"]
        );
        assert_eq!(adt(AdtEvent::Transfer), ["MSH", "EVN", "PID", "PD1", "PV1"]);
        assert_eq!(
            adt(AdtEvent::Discharge),
            ["MSH", "EVN", "PID", "PD1", "PV1", "AL1"]
        );
        assert_eq!(
            adt(AdtEvent::PreAdmit),
            ["MSH", "EVN", "PID", "PD1", "PV1", "PV2", "AL1", "NK1", "NK1", "DG1"]
        );
        assert_eq!(
            adt(AdtEvent::UpdatePatient),
            ["MSH", "EVN", "PID", "PV1", "AL1", "DG1", "PR1"]
        );
        assert_eq!(
            adt(AdtEvent::AddPerson),
            ["MSH", "EVN", "PID", "PD1", "PV1", "AL1"]
        );
        assert_eq!(
            adt(AdtEvent::PendingDischarge),
            ["MSH", "EVN", "PID", "PD1", "PV1", "PV2"]
        );
        assert_eq!(
            adt(AdtEvent::PendingTransfer),
            ["MSH", "EVN", "PID", "PD1", "PV1"]
        );
        assert_eq!(adt(AdtEvent::DeleteVisit), ["MSH", "EVN", "PID", "PV1"]);
        assert_eq!(
            adt(AdtEvent::MergePatientId { with_mrn: "OLD" }),
            ["MSH", "EVN", "PID", "PD1", "MRG"]
        );
        let mrns = vec!["A".to_string(), "B".to_string()];
        assert_eq!(
            adt(AdtEvent::MergePatients { with_mrns: &mrns }),
            ["MSH", "EVN", "PID", "PD1", "MRG", "PV1"]
        );
    }

    #[test]
    fn update_patient_uses_pseudo_visit() {
        let msg = encoder()
            .build_adt(
                &header(),
                &patient(),
                &AdtEvent::UpdatePerson,
                &t(10),
                &t(11),
            )
            .expect("build adt");
        assert!(msg.message.contains("\rPV1|1|N|\r"));
    }

    #[test]
    fn bed_swap_carries_both_patients() {
        let mut other = patient();
        other.person.mrn = "MRN2".into();
        let msg = encoder()
            .build_adt(
                &header(),
                &patient(),
                &AdtEvent::BedSwap { other: &other },
                &t(10),
                &t(11),
            )
            .expect("build adt");
        assert_eq!(
            segment_names(&msg),
            ["MSH", "EVN", "PID", "PD1", "PV1", "PID", "PD1", "PV1"]
        );
        assert!(msg.message.contains("PID|1|MRN2^"));
    }

    #[test]
    fn cancel_events_send_occurred_time() {
        let mut p = patient();
        p.admission_date = NullTime::valid(t(8));
        let msg = encoder()
            .build_adt(&header(), &p, &AdtEvent::CancelVisit, &t(10), &t(11))
            .expect("build adt");
        let evn = msg.message.split('\r').nth(1).expect("evn");
        assert_eq!(evn, "EVN|A11|20200212100000||||20200212080000");
    }

    #[test]
    fn pending_events_send_planned_time() {
        let mut p = patient();
        p.expected_transfer_date_time = NullTime::valid(t(15));
        let msg = encoder()
            .build_adt(&header(), &p, &AdtEvent::PendingTransfer, &t(10), &t(11))
            .expect("build adt");
        let evn = msg.message.split('\r').nth(1).expect("evn");
        assert_eq!(evn, "EVN|A15|20200212100000|20200212150000|||");
    }

    fn lab_order() -> Order {
        Order {
            order_profile: Some(CodedElement::new(
                "lpdc-3969",
                "UREA AND ELECTROLYTES",
                "WinPath",
            )),
            placer: "1".into(),
            filler: "2".into(),
            order_control: "NW".into(),
            order_status: "CM".into(),
            results_status: "F".into(),
            order_date_time: NullTime::valid(t(9)),
            results: vec![
                LabResult {
                    test_name: Some(CodedElement::new("lpdc-2012", "Creatinine", "WinPath")),
                    value: "52".into(),
                    value_type: Some(ValueType::Numeric),
                    notes: vec!["first".into(), "second".into()],
                    ..LabResult::default()
                },
                LabResult {
                    test_name: Some(CodedElement::new("lpdc-2828", "Potassium", "WinPath")),
                    value: "4.1".into(),
                    value_type: Some(ValueType::Numeric),
                    ..LabResult::default()
                },
            ],
            ..Order::default()
        }
    }

    #[test]
    fn oru_numbers_observations_after_previous_results() {
        let mut order = lab_order();
        order.number_of_previous_results = 2;
        let msg = encoder()
            .build_result(&header(), &patient(), &order, ResultTrigger::R01, &t(11))
            .expect("build oru");
        assert_eq!(msg.message_type, MessageType::new("ORU", "R01"));
        assert_eq!(
            segment_names(&msg),
            ["MSH", "PID", "PV1", "ORC", "OBR", "OBX", "NTE", "NTE", "OBX"]
        );
        let lines: Vec<&str> = msg.message.split('\r').collect();
        assert!(lines[5].starts_with("OBX|3|NM|"));
        assert_eq!(lines[6], "NTE|0||first|");
        assert_eq!(lines[7], "NTE|1||second|");
        assert!(lines[8].starts_with("OBX|4|NM|"));
    }

    #[test]
    fn oru_for_clinical_document_sends_one_obx_per_content() {
        let content = |body: &str| ClinicalNoteContent {
            content_type: "txt".into(),
            document_encoding: "Base64".into(),
            document_content: body.into(),
            ..ClinicalNoteContent::default()
        };
        let order = Order {
            diagnostic_serv_id: "MDOC".into(),
            results: vec![LabResult {
                clinical_note: Some(ClinicalNote {
                    document_id: "doc-1".into(),
                    document_type: "ECG".into(),
                    contents: vec![content("one"), content("two")],
                    ..ClinicalNote::default()
                }),
                ..LabResult::default()
            }],
            ..Order::default()
        };
        let msg = encoder()
            .build_result(&header(), &patient(), &order, ResultTrigger::R03, &t(11))
            .expect("build oru");
        let lines: Vec<&str> = msg.message.split('\r').collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[4].contains("|doc-1^HNAM_CEREF~doc-1^HNAM_EVENTID|"));
        assert!(lines[5].starts_with("OBX|1||ECG^ECG||^^txt^Base64^one|"));
        assert!(lines[6].starts_with("OBX|2||ECG^ECG||^^txt^Base64^two|"));
    }

    #[test]
    fn oru_for_clinical_document_without_note_fails() {
        let order = Order {
            diagnostic_serv_id: "MDOC".into(),
            results: vec![LabResult::default()],
            ..Order::default()
        };
        let err = encoder()
            .build_result(&header(), &patient(), &order, ResultTrigger::R01, &t(11))
            .expect_err("should fail");
        assert!(matches!(err, Hl7Error::Segment { segment: "OBR", .. }));
    }

    #[test]
    fn orm_sends_order_notes_and_questionnaire_results() {
        let mut order = lab_order();
        order.notes_for_orm = vec!["fasting".into()];
        order.results_for_orm = vec![LabResult {
            test_name: Some(CodedElement::new("PERSONUKRES", "Resident", "")),
            value: "Yes".into(),
            value_type: Some(ValueType::Other("CD".into())),
            ..LabResult::default()
        }];
        let msg = encoder()
            .build_order(&header(), &patient(), &order, &t(11))
            .expect("build orm");
        assert_eq!(
            segment_names(&msg),
            ["MSH", "PID", "PV1", "ORC", "OBR", "NTE", "OBX"]
        );
        assert!(msg.message.contains("\rOBX|1|CD|PERSONUKRES^Resident^^^||Yes|"));
    }

    #[test]
    fn orr_acknowledges_original_order() {
        let mut order = lab_order();
        order.message_control_id_original_order = "ORIG-1".into();
        let msg = encoder()
            .build_order_response(&header(), &patient(), &order, &t(11))
            .expect("build orr");
        assert_eq!(segment_names(&msg), ["MSH", "MSA", "PID", "ORC"]);
        assert!(msg.message.contains("\rMSA|AA|ORIG-1\r"));
    }

    #[test]
    fn mdm_sends_one_obx_per_line() {
        let document = Document {
            document_type: "DS".into(),
            content_line: vec!["line one".into(), "line two".into()],
            observation_identifier: Some(CodedElement::new("DOC", "Document", "")),
            ..Document::default()
        };
        let msg = encoder()
            .build_document(&header(), &patient(), &document, &t(10), &t(11))
            .expect("build mdm");
        assert_eq!(
            segment_names(&msg),
            ["MSH", "EVN", "PID", "PV1", "TXA", "OBX", "OBX"]
        );
        assert!(msg.message.ends_with("OBX|2|TX|DOC^Document^^^|1|line two||||||F||||||"));
    }

    #[test]
    fn non_utc_time_fails_whole_message() {
        let offset = FixedOffset::east_opt(3600).expect("offset");
        let local = offset
            .with_ymd_and_hms(2020, 2, 12, 10, 0, 0)
            .single()
            .expect("valid date");
        let mut p = patient();
        p.person.birth = NullTime::valid(local);
        let err = encoder()
            .build_adt(&header(), &p, &AdtEvent::Admission, &t(10), &t(11))
            .expect_err("should fail");
        assert!(matches!(err, Hl7Error::Segment { segment: "PID", .. }));
    }

    #[test]
    fn custom_segment_terminator() {
        let msg = encoder()
            .with_segment_terminator("\n")
            .build_order_response(&header(), &patient(), &lab_order(), &t(11))
            .expect("build orr");
        assert_eq!(msg.message.lines().count(), 4);
    }
}
