//! Per-segment renderers.
//!
//! Each segment has a fixed field order. Composite sub-structures (locations, providers, coded
//! elements, names, addresses) are rendered by their own helpers, which return an empty field when
//! the structure is absent instead of a run of empty components.
//!
//! Set IDs are passed in by the message assemblers; this module does not number anything itself.

use crate::datetime::{format_null_time, format_time};
use crate::messages::{Hl7Encoder, MessageType};
use crate::model::{
    Address, Allergy, AssociatedParty, ClinicalNote, ClinicalNoteContent, DiagnosisOrProcedure,
    Doctor, Document, HeaderInfo, LabResult, Order, PatientInfo, PatientLocation, Person,
    PrimaryFacility,
};
use crate::{Hl7Error, Hl7Result};
use chrono::{DateTime, TimeZone, Utc};
use labsim_types::{CodedElement, NullTime};
use std::fmt::Display;

const PROCESSING_ID: &str = "T";
const VERSION_ID: &str = "2.3";
const ACCEPT_ACK_TYPE: &str = "AL";
const COUNTRY_CODE: &str = "44";
const CHARACTER_SET: &str = "ASCII";
const DIAGNOSIS_CODING_METHOD: &str = "SNMCT";

impl<Tz> Hl7Encoder<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    // ========================================================================
    // Header and event segments
    // ========================================================================

    /// MSH: message header.
    pub fn msh(
        &self,
        msg_time: &DateTime<Utc>,
        message_type: &MessageType,
        header: &HeaderInfo,
    ) -> String {
        let d = &self.delimiters;
        let encoding = d.encoding_characters();
        let time = format_time(msg_time, &self.tz);
        let kind = d.components(&[message_type.message_type, message_type.trigger_event]);
        d.fields(&[
            "MSH",
            &encoding,
            &header.sending_application,
            &header.sending_facility,
            &header.receiving_application,
            &header.receiving_facility,
            &time,
            "",
            &kind,
            &header.message_control_id,
            PROCESSING_ID,
            VERSION_ID,
            "",
            "",
            ACCEPT_ACK_TYPE,
            "",
            COUNTRY_CODE,
            CHARACTER_SET,
        ])
    }

    /// MSA: acknowledgement of the message that placed the order.
    pub fn msa(&self, original_control_id: &str) -> String {
        self.delimiters.fields(&["MSA", "AA", original_control_id])
    }

    /// EVN: event type, with optional planned and occurred times.
    pub fn evn(
        &self,
        event_time: &DateTime<Utc>,
        message_type: &MessageType,
        planned: &NullTime,
        operator: Option<&Doctor>,
        occurred: &NullTime,
    ) -> Hl7Result<String> {
        let time = format_time(event_time, &self.tz);
        let planned = self.date(planned)?;
        let operator = self.doctor(operator);
        let occurred = self.date(occurred)?;
        Ok(self.delimiters.fields(&[
            "EVN",
            message_type.trigger_event,
            &time,
            &planned,
            "",
            &operator,
            &occurred,
        ]))
    }

    // ========================================================================
    // Patient and visit segments
    // ========================================================================

    /// PID: patient identification. The MRN is sent twice and the NHS number as a second
    /// repetition of PID-3.
    pub fn pid(&self, person: &Person) -> Hl7Result<String> {
        let d = &self.delimiters;
        let mrn = self.cx_mrn(&person.mrn);
        let nhs = d.components(&[&person.nhs, "", "", "NHSNBR", "NHSNMBR"]);
        let identifiers = d.repetitions(&[mrn.as_str(), nhs.as_str()]);
        let name = self.person_name(person);
        let birth = self.date(&person.birth)?;
        let address = self.address(person.address.as_ref());
        let phone = self.home_number(&person.phone_number);
        let ethnicity = self.coded(person.ethnicity.as_ref());
        let death = self.date(&person.date_of_death)?;
        Ok(d.fields(&[
            "PID",
            "1",
            &mrn,
            &identifiers,
            "",
            &name,
            "",
            &birth,
            &person.gender,
            "",
            "",
            &address,
            "",
            &phone,
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            &ethnicity,
            "",
            "",
            "",
            "",
            "",
            "",
            &death,
            &person.death_indicator,
        ]))
    }

    /// PD1: additional demographics, carrying only the primary facility.
    pub fn pd1(&self, patient: &PatientInfo) -> String {
        let facility = self.primary_facility(patient.primary_facility.as_ref());
        self.delimiters.fields(&["PD1", "", "", &facility, ""])
    }

    /// PV1: patient visit.
    pub fn pv1(&self, patient: &PatientInfo) -> Hl7Result<String> {
        let location = self.location(patient.location.as_ref());
        let prior = self.location(patient.prior_location.as_ref());
        let attending = self.doctor(patient.attending_doctor.as_ref());
        let temporary = self.location(patient.temporary_location.as_ref());
        let visit = self.cx_visit(patient.visit_id);
        let pending = self.location(patient.pending_location.as_ref());
        let prior_temporary = self.location(patient.prior_temporary_location.as_ref());
        let admission = self.date(&patient.admission_date)?;
        let discharge = self.date(&patient.discharge_date)?;

        let mut fields: Vec<&str> = Vec::new();
        fields.extend_from_slice(&[
            "PV1",
            "1",
            &patient.class,
            &location,
            "28b",
            "",
            &prior,
            &attending,
            "",
            "",
            &patient.hospital_service,
            &temporary,
        ]);
        // PV1-12 to PV1-17
        fields.extend(std::iter::repeat("").take(6));
        fields.push(&patient.patient_type);
        fields.push(&visit);
        // PV1-20 to PV1-40
        fields.extend(std::iter::repeat("").take(21));
        fields.extend_from_slice(&[
            patient.account_status.as_str(),
            &pending,
            &prior_temporary,
            &admission,
            &discharge,
            "",
        ]);
        Ok(self.delimiters.fields(&fields))
    }

    /// PV1 for messages where the visit is not relevant; the patient class is "not applicable".
    pub fn pseudo_pv1(&self) -> String {
        self.delimiters.fields(&["PV1", "1", "N", ""])
    }

    /// PV2: pending location and expected admission/discharge times.
    pub fn pv2(&self, patient: &PatientInfo) -> Hl7Result<String> {
        let prior_pending = self.location(patient.prior_pending_location.as_ref());
        let admit = self.date(&patient.expected_admit_date_time)?;
        let discharge = self.date(&patient.expected_discharge_date_time)?;
        Ok(self.delimiters.fields(&[
            "PV2",
            &prior_pending,
            "",
            "",
            "",
            "",
            "",
            "",
            &admit,
            &discharge,
        ]))
    }

    /// NK1: next of kin.
    pub fn nk1(&self, set_id: usize, party: &AssociatedParty) -> String {
        let id = set_id.to_string();
        let name = self.person_name(&party.person);
        let relationship = self.coded(party.relationship.as_ref());
        let address = self.address(party.person.address.as_ref());
        let phone = self.home_number(&party.person.phone_number);
        let role = self.coded(party.contact_role.as_ref());
        self.delimiters.fields(&[
            "NK1",
            &id,
            &name,
            &relationship,
            &address,
            &phone,
            "",
            &role,
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            &party.person.gender,
            "",
        ])
    }

    /// AL1: allergy.
    pub fn al1(&self, set_id: usize, allergy: &Allergy) -> Hl7Result<String> {
        let id = set_id.to_string();
        let description = self.coded(Some(&allergy.description));
        let identified = self.date(&allergy.identification_date_time)?;
        Ok(self.delimiters.fields(&[
            "AL1",
            &id,
            &allergy.allergy_type,
            &description,
            &allergy.severity,
            &allergy.reaction,
            &identified,
        ]))
    }

    /// DG1: diagnosis.
    pub fn dg1(&self, set_id: usize, diagnosis: &DiagnosisOrProcedure) -> Hl7Result<String> {
        let id = set_id.to_string();
        let description = self.coded(diagnosis.description.as_ref());
        let text = self.description_text(diagnosis);
        let date = self.date(&diagnosis.date_time)?;
        let clinician = self.doctor(diagnosis.clinician.as_ref());
        let mut fields: Vec<&str> = Vec::new();
        fields.extend_from_slice(&[
            "DG1",
            &id,
            DIAGNOSIS_CODING_METHOD,
            &description,
            &text,
            &date,
            &diagnosis.kind,
        ]);
        // DG1-7 to DG1-14
        fields.extend(std::iter::repeat("").take(8));
        fields.extend_from_slice(&["0", clinician.as_str()]);
        Ok(self.delimiters.fields(&fields))
    }

    /// PR1: procedure.
    pub fn pr1(&self, set_id: usize, procedure: &DiagnosisOrProcedure) -> Hl7Result<String> {
        let id = set_id.to_string();
        let description = self.coded(procedure.description.as_ref());
        let text = self.description_text(procedure);
        let date = self.date(&procedure.date_time)?;
        let clinician = self.doctor(procedure.clinician.as_ref());
        Ok(self.delimiters.fields(&[
            "PR1",
            &id,
            DIAGNOSIS_CODING_METHOD,
            &description,
            &text,
            &date,
            &procedure.kind,
            "",
            "",
            "",
            "",
            "",
            &clinician,
            "",
            "0",
            "",
            "",
        ]))
    }

    /// MRG: merged patient identifiers.
    pub fn mrg(&self, mrns: &[String]) -> String {
        let ids: Vec<String> = mrns.iter().map(|mrn| self.cx_mrn(mrn)).collect();
        let ids = self.delimiters.repetitions(&ids);
        self.delimiters.fields(&["MRG", &ids, ""])
    }

    // ========================================================================
    // Order and observation segments
    // ========================================================================

    /// ORC: common order.
    pub fn orc(&self, order: &Order) -> Hl7Result<String> {
        let ordered = self.date(&order.order_date_time)?;
        Ok(self.delimiters.fields(&[
            "ORC",
            &order.order_control,
            &order.placer,
            &order.filler,
            "",
            &order.order_status,
            "",
            "",
            "",
            &ordered,
        ]))
    }

    /// OBR: observation request.
    ///
    /// For clinical-document orders the filler number is replaced by the document ID of the
    /// first result's note.
    ///
    /// # Errors
    ///
    /// Returns [`Hl7Error::InvalidInput`] if a clinical-document order has no note on its first
    /// result, and any date formatting error.
    pub fn obr(&self, order: &Order) -> Hl7Result<String> {
        let d = &self.delimiters;
        let filler = if order.is_clinical_document() {
            let note = first_clinical_note(order)?;
            let ce_ref = d.components(&[&note.document_id, "HNAM_CEREF"]);
            let event_id = d.components(&[&note.document_id, "HNAM_EVENTID"]);
            d.repetitions(&[ce_ref, event_id])
        } else {
            order.filler.clone()
        };
        let profile = self.coded(order.order_profile.as_ref());
        let ordered = self.date(&order.order_date_time)?;
        let collected = self.date(&order.collected_date_time)?;
        let received = self.date(&order.received_in_lab_date_time)?;
        let provider = self.doctor(order.ordering_provider.as_ref());
        let reported = self.date(&order.reported_date_time)?;

        let mut fields: Vec<&str> = Vec::new();
        fields.extend_from_slice(&[
            "OBR",
            "1",
            &order.placer,
            &filler,
            &profile,
            "",
            &ordered,
            &collected,
        ]);
        // OBR-8 to OBR-13
        fields.extend(std::iter::repeat("").take(6));
        fields.extend_from_slice(&[received.as_str(), &order.specimen_source, &provider]);
        // OBR-17 to OBR-21
        fields.extend(std::iter::repeat("").take(5));
        fields.extend_from_slice(&[
            reported.as_str(),
            "",
            &order.diagnostic_serv_id,
            &order.results_status,
            "",
            "1",
        ]);
        Ok(d.fields(&fields))
    }

    /// OBX: one lab observation.
    pub fn obx(&self, set_id: usize, result: &LabResult) -> Hl7Result<String> {
        let d = &self.delimiters;
        let id = set_id.to_string();
        let value_type = result.value_type.as_ref().map_or("", |v| v.as_str());
        let test = self.coded(result.test_name.as_ref());
        let value = d.repeated(&result.value);
        let unit = d.unit(&result.unit);
        let range = d.escape(&result.range);
        let observed = self.date(&result.observation_date_time)?;
        Ok(d.fields(&[
            "OBX",
            &id,
            value_type,
            &test,
            "",
            &value,
            &unit,
            &range,
            &result.abnormal_flag,
            "",
            "",
            &result.status,
            "",
            "",
            &observed,
            "",
            "",
        ]))
    }

    /// OBX carrying one content of a clinical note.
    pub fn obx_clinical_note(
        &self,
        set_id: usize,
        result: &LabResult,
        content: &ClinicalNoteContent,
        order: &Order,
    ) -> Hl7Result<String> {
        let d = &self.delimiters;
        let id = set_id.to_string();
        let value_type = result.value_type.as_ref().map_or("", |v| v.as_str());
        let document = self.note_coded(result.clinical_note.as_ref());
        let value = self.note_value(content);
        let observed = self.date(&result.observation_date_time)?;
        let provider = self.doctor(order.ordering_provider.as_ref());

        let mut fields: Vec<&str> = Vec::new();
        fields.extend_from_slice(&["OBX", &id, value_type, &document, "", &value]);
        // OBX-6 to OBX-13
        fields.extend(std::iter::repeat("").take(8));
        fields.extend_from_slice(&[observed.as_str(), "", &provider]);
        Ok(d.fields(&fields))
    }

    /// OBX carrying one line of an MDM document.
    pub fn obx_for_mdm(
        &self,
        set_id: usize,
        identifier: Option<&CodedElement>,
        line: &str,
    ) -> String {
        let d = &self.delimiters;
        let id = set_id.to_string();
        let identifier = self.coded(identifier);
        let line = d.escape(line);
        let mut fields: Vec<&str> = Vec::new();
        fields.extend_from_slice(&["OBX", &id, "TX", &identifier, "1", &line]);
        // OBX-6 to OBX-10
        fields.extend(std::iter::repeat("").take(5));
        fields.push("F");
        // OBX-12 to OBX-17
        fields.extend(std::iter::repeat("").take(6));
        d.fields(&fields)
    }

    /// NTE: free-text note.
    pub fn nte(&self, set_id: usize, note: &str) -> String {
        let id = set_id.to_string();
        let note = self.delimiters.escape(note);
        self.delimiters.fields(&["NTE", &id, "", &note, ""])
    }

    /// TXA: transcription document header.
    pub fn txa(&self, patient: &PatientInfo, document: &Document) -> Hl7Result<String> {
        let activity = self.date(&document.activity_date_time)?;
        let attending = self.doctor(patient.attending_doctor.as_ref());
        let edited = self.date(&document.edit_date_time)?;
        let mut fields: Vec<&str> = Vec::new();
        fields.extend_from_slice(&[
            "TXA",
            "1",
            &document.document_type,
            "",
            &activity,
            &attending,
            "",
            "",
            &edited,
            "",
            "",
            "",
            &document.unique_document_number,
        ]);
        // TXA-13 to TXA-16
        fields.extend(std::iter::repeat("").take(4));
        fields.push(&document.document_completion_status);
        fields.extend(std::iter::repeat("").take(6));
        Ok(self.delimiters.fields(&fields))
    }

    // ========================================================================
    // Composite data types (internal)
    // ========================================================================

    fn date(&self, t: &NullTime) -> Hl7Result<String> {
        format_null_time(t, &self.tz)
    }

    /// PL: person location.
    fn location(&self, location: Option<&PatientLocation>) -> String {
        let Some(l) = location else {
            return String::new();
        };
        self.delimiters.components(&[
            &l.poc,
            &l.room,
            &l.bed,
            &l.facility,
            "",
            &l.location_type,
            &l.building,
            &l.floor,
        ])
    }

    /// XCN: provider ID and name.
    fn doctor(&self, doctor: Option<&Doctor>) -> String {
        let Some(doc) = doctor else {
            return String::new();
        };
        self.delimiters.components(&[
            &doc.id,
            &doc.surname,
            &doc.first_name,
            "",
            "",
            &doc.prefix,
            "",
            "",
            "DRNBR",
            "PRSNL",
            "",
            "",
            "ORGDR",
        ])
    }

    /// XPN: person name.
    fn person_name(&self, p: &Person) -> String {
        self.delimiters.components(&[
            &p.surname,
            &p.first_name,
            &p.middle_name,
            &p.suffix,
            &p.prefix,
            &p.degree,
            "CURRENT",
        ])
    }

    /// XAD: address.
    fn address(&self, address: Option<&Address>) -> String {
        let Some(a) = address else {
            return String::new();
        };
        self.delimiters.components(&[
            &a.first_line,
            &a.second_line,
            &a.city,
            "",
            &a.postal_code,
            &a.country,
            &a.address_type,
        ])
    }

    /// XTN: home phone number.
    fn home_number(&self, phone: &str) -> String {
        if phone.is_empty() {
            return String::new();
        }
        self.delimiters.components(&[phone, "HOME"])
    }

    /// CE: coded element. The coding system is never escaped.
    fn coded(&self, ce: Option<&CodedElement>) -> String {
        let Some(ce) = ce else {
            return String::new();
        };
        let d = &self.delimiters;
        d.components(&[
            &d.escape(&ce.id),
            &d.escape(&ce.text),
            &ce.coding_system,
            "",
            &d.escape(&ce.alternate_text),
        ])
    }

    /// CE for clinical notes: the document type as both identifier and text.
    fn note_coded(&self, note: Option<&ClinicalNote>) -> String {
        let Some(note) = note else {
            return String::new();
        };
        self.delimiters
            .components(&[&note.document_type, &note.document_type])
    }

    /// ED: encapsulated note content.
    fn note_value(&self, content: &ClinicalNoteContent) -> String {
        let d = &self.delimiters;
        d.components(&[
            "",
            "",
            &content.content_type,
            &content.document_encoding,
            &d.escape(&content.document_content),
        ])
    }

    /// XON: organisation name and ID.
    fn primary_facility(&self, facility: Option<&PrimaryFacility>) -> String {
        let Some(f) = facility else {
            return String::new();
        };
        self.delimiters.components(&[&f.organization, "", &f.id])
    }

    /// CX for the visit number. A zero visit ID is not sent.
    fn cx_visit(&self, visit_id: u64) -> String {
        if visit_id == 0 {
            return String::new();
        }
        let id = visit_id.to_string();
        self.delimiters.components(&[&id, "", "", "", "visitid"])
    }

    /// CX for a medical record number.
    fn cx_mrn(&self, mrn: &str) -> String {
        self.delimiters
            .components(&[mrn, "", "", "SIMULATOR MRN", "MRN"])
    }

    fn description_text(&self, d: &DiagnosisOrProcedure) -> String {
        d.description
            .as_ref()
            .map(|ce| self.delimiters.escape(&ce.text))
            .unwrap_or_default()
    }
}

/// Returns the note on the first result of a clinical-document order.
pub(crate) fn first_clinical_note(order: &Order) -> Hl7Result<&ClinicalNote> {
    order
        .results
        .first()
        .and_then(|r| r.clinical_note.as_ref())
        .ok_or_else(|| {
            Hl7Error::InvalidInput(
                "clinical document order must carry a clinical note on its first result".into(),
            )
        })
}
