//! Domain message model.
//!
//! Responsibilities:
//! - Define the order/result/clinical-note graph produced by the lifecycle engine
//! - Define the patient, visit and header inputs consumed read-only by the encoder
//!
//! Notes:
//! - Optional sub-structures are `Option`s; an absent one renders as an empty field
//! - Status and control fields are plain strings because their vocabulary is configured

use labsim_types::{CodedElement, NullTime};

/// Value of the diagnostic service ID (OBR-24) that marks a clinical-document order.
pub const DIAGNOSTIC_SERV_ID_MDOC: &str = "MDOC";

// ============================================================================
// Orders and results
// ============================================================================

/// One clinical order and its results.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Order {
    pub order_profile: Option<CodedElement>,
    pub placer: String,
    pub filler: String,

    pub order_date_time: NullTime,
    pub collected_date_time: NullTime,
    pub received_in_lab_date_time: NullTime,
    pub reported_date_time: NullTime,

    pub order_control: String,
    /// Control ID of the message that placed the order; acknowledged by ORR^O02.
    pub message_control_id_original_order: String,
    pub order_status: String,
    pub results_status: String,

    pub results: Vec<LabResult>,
    /// Results sent inside the order message itself (ORM^O01), such as questionnaire answers.
    pub results_for_orm: Vec<LabResult>,
    pub notes_for_orm: Vec<String>,

    pub ordering_provider: Option<Doctor>,
    pub specimen_source: String,
    pub diagnostic_serv_id: String,

    /// Number of results already sent for this order. OBX set IDs continue after it.
    pub number_of_previous_results: usize,
}

impl Order {
    /// Returns `true` if this order carries a clinical document rather than lab results.
    pub fn is_clinical_document(&self) -> bool {
        self.diagnostic_serv_id == DIAGNOSTIC_SERV_ID_MDOC
    }
}

/// HL7 value type of an observation (OBX-2).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// `NM`
    Numeric,
    /// `TX`
    Text,
    /// `CE`
    CodedEntry,
    /// Any other code, kept verbatim.
    Other(String),
}

impl ValueType {
    /// Parses a value type code. Returns `None` for an empty or blank code.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "" => None,
            "NM" => Some(Self::Numeric),
            "TX" => Some(Self::Text),
            "CE" => Some(Self::CodedEntry),
            other => Some(Self::Other(other.to_string())),
        }
    }

    /// Returns the HL7 code for this value type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Numeric => "NM",
            Self::Text => "TX",
            Self::CodedEntry => "CE",
            Self::Other(code) => code,
        }
    }
}

/// One observation within an order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabResult {
    pub test_name: Option<CodedElement>,
    /// Observation value. Embedded newlines separate repeated values.
    pub value: String,
    pub unit: String,
    pub value_type: Option<ValueType>,
    pub range: String,
    pub abnormal_flag: String,
    pub observation_date_time: NullTime,
    pub status: String,
    pub notes: Vec<String>,
    pub clinical_note: Option<ClinicalNote>,
}

/// A clinical document attached to a result.
///
/// `contents` only grows: each revision of the document appends one or more contents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClinicalNote {
    pub date_time: NullTime,
    pub document_title: String,
    pub document_type: String,
    pub document_id: String,
    pub contents: Vec<ClinicalNoteContent>,
}

/// One content blob of a clinical note revision.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClinicalNoteContent {
    pub observation_date_time: NullTime,
    pub content_type: String,
    pub document_encoding: String,
    pub document_content: String,
}

/// A free-text document sent as MDM^T02.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub activity_date_time: NullTime,
    pub edit_date_time: NullTime,
    pub document_type: String,
    pub document_completion_status: String,
    pub unique_document_number: String,
    pub observation_identifier: Option<CodedElement>,
    /// One OBX segment is sent per line.
    pub content_line: Vec<String>,
}

// ============================================================================
// Patients and visits
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Person {
    pub prefix: String,
    pub first_name: String,
    pub middle_name: String,
    pub surname: String,
    pub suffix: String,
    pub degree: String,
    pub gender: String,
    pub ethnicity: Option<CodedElement>,
    pub birth: NullTime,
    pub date_of_death: NullTime,
    pub address: Option<Address>,
    pub phone_number: String,
    pub mrn: String,
    pub nhs: String,
    pub death_indicator: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Address {
    pub first_line: String,
    pub second_line: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    /// Address type, for example `HOME`.
    pub address_type: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientLocation {
    pub poc: String,
    pub room: String,
    pub bed: String,
    pub facility: String,
    pub location_type: String,
    pub building: String,
    pub floor: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Doctor {
    pub id: String,
    pub surname: String,
    pub first_name: String,
    pub prefix: String,
    /// Not rendered in any segment.
    pub specialty: String,
}

/// Next of kin or other contact of the patient.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssociatedParty {
    pub person: Person,
    pub relationship: Option<CodedElement>,
    pub contact_role: Option<CodedElement>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Allergy {
    pub allergy_type: String,
    pub description: CodedElement,
    pub severity: String,
    pub reaction: String,
    pub identification_date_time: NullTime,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiagnosisOrProcedure {
    pub description: Option<CodedElement>,
    pub kind: String,
    pub clinician: Option<Doctor>,
    pub date_time: NullTime,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrimaryFacility {
    pub organization: String,
    pub id: String,
}

/// Patient and visit state as seen by the encoder.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatientInfo {
    pub person: Person,
    /// Patient class, for example `INPATIENT` or `OUTPATIENT`.
    pub class: String,
    pub patient_type: String,
    /// Zero means no visit number is sent.
    pub visit_id: u64,
    pub hospital_service: String,
    pub location: Option<PatientLocation>,
    pub prior_location: Option<PatientLocation>,
    pub pending_location: Option<PatientLocation>,
    pub prior_pending_location: Option<PatientLocation>,
    pub temporary_location: Option<PatientLocation>,
    pub prior_temporary_location: Option<PatientLocation>,
    pub attending_doctor: Option<Doctor>,
    pub account_status: String,
    pub admission_date: NullTime,
    pub discharge_date: NullTime,
    pub transfer_date: NullTime,
    pub expected_admit_date_time: NullTime,
    pub expected_discharge_date_time: NullTime,
    pub expected_transfer_date_time: NullTime,
    pub associated_parties: Vec<AssociatedParty>,
    pub allergies: Vec<Allergy>,
    pub diagnoses: Vec<DiagnosisOrProcedure>,
    pub procedures: Vec<DiagnosisOrProcedure>,
    pub primary_facility: Option<PrimaryFacility>,
}

/// Per-message routing metadata for the MSH segment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderInfo {
    pub sending_application: String,
    pub sending_facility: String,
    pub receiving_application: String,
    pub receiving_facility: String,
    pub message_control_id: String,
}
