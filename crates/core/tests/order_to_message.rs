use chrono::{DateTime, Duration, TimeZone, Utc};
use hl7::{
    ClinicalNote, ClinicalNoteContent, HeaderInfo, Hl7Encoder, NullTime, PatientInfo, Person,
    ResultTrigger,
};
use labsim_core::{
    ClinicalNoteSpec, Doctors, MessageConfig, NoteError, NoteGenerator, OrderGenerator,
    OrderProfiles, OrderSpec, ResultSpec, ResultsSpec, SequenceIdGenerator, ValueRequest,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

const CONFIG_YAML: &str = r#"
order_control:
  new: NW
order_status:
  in_process: IP
  completed: CM
result_status:
  final: F
  corrected: C
  authenticated_verified: AUTHVRF
abnormal_flags:
  above_high_normal: H
  below_low_normal: L
coding_system: WinPath
"#;

const PROFILES_YAML: &str = r#"
UREA AND ELECTROLYTES:
  universal_service_id: lpdc-3969
  test_types:
    Creatinine:
      id: lpdc-2012
      value_type: NM
      unit: UMOLL
      ref_range: 49 - 92
    Potassium:
      id: lpdc-2804
      value_type: NM
      unit: MMOLL
      ref_range: 3.5 - 5.3
"#;

const DOCTORS_YAML: &str = r#"
- id: "C1234"
  surname: "Osman"
  firstname: "Arthur"
  prefix: "Dr"
  specialty: "Renal"
"#;

/// Appends one content per call to the note it is given.
struct AppendingNotes;

impl NoteGenerator for AppendingNotes {
    fn random_notes_for_result(&self) -> Vec<String> {
        vec!["Sample slightly haemolysed".to_string()]
    }

    fn random_document_for_clinical_note(
        &self,
        spec: &ClinicalNoteSpec,
        existing: Option<&ClinicalNote>,
        at: DateTime<Utc>,
    ) -> Result<ClinicalNote, NoteError> {
        let mut note = existing.cloned().unwrap_or_else(|| ClinicalNote {
            date_time: NullTime::valid(at),
            document_id: spec.document_id.clone(),
            ..ClinicalNote::default()
        });
        note.document_title = spec.document_title.clone();
        note.document_type = spec.document_type.clone();
        note.contents.push(ClinicalNoteContent {
            observation_date_time: NullTime::valid(at),
            content_type: spec.content_type.clone(),
            document_encoding: "base64".to_string(),
            document_content: format!("revision {}", note.contents.len() + 1),
        });
        Ok(note)
    }
}

fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("create file");
    file.write_all(contents.as_bytes()).expect("write file");
    path
}

fn generator() -> OrderGenerator {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = MessageConfig::load(&write_file(dir.path(), "hl7.yml", CONFIG_YAML))
        .expect("config should load");
    let profiles = OrderProfiles::load(
        &write_file(dir.path(), "order_profiles.yml", PROFILES_YAML),
        &config,
    )
    .expect("profiles should load");
    let doctors = Doctors::load(&write_file(dir.path(), "doctors.yml", DOCTORS_YAML))
        .expect("doctors should load");

    OrderGenerator::new(
        config,
        Arc::new(profiles),
        Arc::new(doctors),
        Arc::new(AppendingNotes),
        Arc::new(SequenceIdGenerator::new(1000)),
        Arc::new(SequenceIdGenerator::new(5000)),
    )
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 2, 12, hour, 0, 0)
        .single()
        .expect("valid date")
}

fn patient() -> PatientInfo {
    PatientInfo {
        person: Person {
            first_name: "Ada".into(),
            surname: "Lovelace".into(),
            mrn: "MRN-1".into(),
            ..Person::default()
        },
        class: "INPATIENT".into(),
        ..PatientInfo::default()
    }
}

fn header(control_id: &str) -> HeaderInfo {
    HeaderInfo {
        sending_application: "LABSIM".into(),
        sending_facility: "LAB".into(),
        receiving_application: "EPR".into(),
        receiving_facility: "HOSP".into(),
        message_control_id: control_id.into(),
    }
}

fn segments(message: &str) -> Vec<Vec<&str>> {
    message
        .split('\r')
        .filter(|s| !s.is_empty())
        .map(|s| s.split('|').collect())
        .collect()
}

fn segments_named<'a>(all: &'a [Vec<&'a str>], name: &str) -> Vec<&'a Vec<&'a str>> {
    all.iter().filter(|s| s[0] == name).collect()
}

#[test]
fn order_and_results_render_as_messages() {
    let g = generator();
    let encoder = Hl7Encoder::new(Utc);
    let mut rng = StdRng::seed_from_u64(42);

    let order = g.new_order(
        &OrderSpec {
            order_profile: "UREA AND ELECTROLYTES".into(),
            order_status: None,
        },
        at(9),
        &mut rng,
    );
    assert_eq!(order.placer, "1000");

    let orm = encoder
        .build_order(&header("1"), &patient(), &order, &at(9))
        .expect("ORM should render");
    assert_eq!(orm.message_type.to_string(), "ORM^O01");
    let orm_segments = segments(&orm.message);
    let orc = segments_named(&orm_segments, "ORC");
    assert_eq!(orc[0][1..6], ["NW", "1000", "", "", "IP"]);

    let spec = ResultsSpec {
        order_profile: "UREA AND ELECTROLYTES".into(),
        results: vec![ResultSpec {
            test_name: "Creatinine".into(),
            value: ValueRequest::from("52"),
            unit: "UMOLL".into(),
            ..ResultSpec::default()
        }],
        ..ResultsSpec::default()
    };
    let reported = g
        .set_results(Some(&order), &spec, at(11), &mut rng)
        .expect("results should be set");
    assert_eq!(reported.filler, "5000");

    let oru = encoder
        .build_result(&header("2"), &patient(), &reported, ResultTrigger::R01, &at(11))
        .expect("ORU should render");
    assert_eq!(oru.message_type.to_string(), "ORU^R01");

    let all = segments(&oru.message);
    let names: Vec<&str> = all.iter().map(|s| s[0]).collect();
    assert_eq!(names, ["MSH", "PID", "PV1", "ORC", "OBR", "OBX", "NTE"]);

    let obr = segments_named(&all, "OBR")[0];
    let profile: Vec<&str> = obr[4].split('^').collect();
    assert_eq!(profile[..3], ["lpdc-3969", "UREA AND ELECTROLYTES", "WinPath"]);
    assert_eq!(obr[7], "20200212110000");
    assert_eq!(obr[25], "F");

    let obx = segments_named(&all, "OBX")[0];
    assert_eq!(obx[1], "1");
    assert_eq!(obx[2], "NM");
    assert_eq!(obx[3].split('^').take(2).collect::<Vec<_>>(), ["lpdc-2012", "Creatinine"]);
    assert_eq!(obx[5], "52");
    assert_eq!(obx[6], "UMOLL");
    assert_eq!(obx[7], "49 - 92");
    assert_eq!(obx[11], "F");

    let nte = segments_named(&all, "NTE")[0];
    assert_eq!(nte[3], "Sample slightly haemolysed");
}

#[test]
fn correction_continues_observation_numbering() {
    let g = generator();
    let encoder = Hl7Encoder::new(Utc);
    let mut rng = StdRng::seed_from_u64(7);

    let first = g
        .set_results(
            None,
            &ResultsSpec {
                order_profile: "UREA AND ELECTROLYTES".into(),
                ..ResultsSpec::default()
            },
            at(10),
            &mut rng,
        )
        .expect("results should be set");
    assert_eq!(first.results.len(), 2);

    let mut sent = first.clone();
    sent.number_of_previous_results = sent.results.len();

    let corrected = g
        .set_results(
            Some(&sent),
            &ResultsSpec {
                order_profile: "UREA AND ELECTROLYTES".into(),
                results: vec![ResultSpec {
                    test_name: "Potassium".into(),
                    value: ValueRequest::from("6.1"),
                    unit: "MMOLL".into(),
                    notes: Some(Vec::new()),
                    ..ResultSpec::default()
                }],
                ..ResultsSpec::default()
            },
            at(10) + Duration::hours(2),
            &mut rng,
        )
        .expect("results should be corrected");
    assert_eq!(corrected.results_status, "C");
    assert_eq!(corrected.results[0], first.results[0]);

    let oru = encoder
        .build_result(&header("3"), &patient(), &corrected, ResultTrigger::R01, &at(12))
        .expect("ORU should render");
    let all = segments(&oru.message);
    let obx = segments_named(&all, "OBX");
    let ids: Vec<&str> = obx.iter().map(|s| s[1]).collect();
    assert_eq!(ids, ["3", "4"]);

    let potassium = obx[1];
    assert_eq!(potassium[5], "6.1");
    assert_eq!(potassium[8], "H");
    assert_eq!(potassium[11], "C");
}

#[test]
fn clinical_note_revisions_render_one_observation_per_content() {
    let g = generator();
    let encoder = Hl7Encoder::new(Utc);
    let mut rng = StdRng::seed_from_u64(1);
    let spec = ClinicalNoteSpec {
        content_type: "txt".into(),
        document_id: "doc-1".into(),
        document_title: "Discharge summary".into(),
        document_type: "DS".into(),
    };

    let first = g
        .order_with_clinical_note(None, &spec, at(9), &mut rng)
        .expect("note order should be built");
    let revised = g
        .order_with_clinical_note(Some(&first), &spec, at(10), &mut rng)
        .expect("note revision should be built");

    let note = revised.results[0]
        .clinical_note
        .as_ref()
        .expect("note should be set");
    let revisions: Vec<&str> = note
        .contents
        .iter()
        .map(|c| c.document_content.as_str())
        .collect();
    assert_eq!(revisions, ["revision 1", "revision 2"]);
    assert_eq!(
        revised.ordering_provider.as_ref().map(|d| d.id.as_str()),
        Some("C1234")
    );

    let oru = encoder
        .build_result(&header("4"), &patient(), &revised, ResultTrigger::R01, &at(10))
        .expect("ORU should render");
    let all = segments(&oru.message);
    assert_eq!(segments_named(&all, "OBX").len(), 2);

    let obr = segments_named(&all, "OBR")[0];
    assert!(obr[3].starts_with("doc-1^HNAM_CEREF"), "{}", obr[3]);
    assert_eq!(obr[24], "MDOC");
    assert_eq!(obr[25], "AUTHVRF");
}
