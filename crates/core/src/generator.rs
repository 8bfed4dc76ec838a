//! Order and result lifecycle engine.
//!
//! Responsibilities:
//! - Place new orders against a named (or random) order profile
//! - Report results on new or existing orders, deriving statuses, dates, values and flags
//! - Wrap clinical documents and their revisions in clinical-document orders
//!
//! Notes:
//! - A previously returned order is an input only; every call returns a new `Order`
//! - Explicit overrides in a request always win over derived values
//! - An unknown profile is tolerated and carried as an uncoded identity; an unknown test in a
//!   known profile and a malformed reference range are errors

use crate::config::MessageConfig;
use crate::constants::RANDOM;
use crate::doctors::DoctorRegistry;
use crate::ids::IdGenerator;
use crate::notes::NoteGenerator;
use crate::order_profile::{OrderProfile, OrderProfileLookup, TestType};
use crate::pathway::{
    ClinicalNoteSpec, DateRequest, FlagRequest, OrderSpec, ResultSpec, ResultsSpec, ValueRequest,
};
use crate::reference_range::{Classification, ReferenceRange, Zone};
use crate::{OrderError, OrderResult};
use chrono::{DateTime, Duration, Utc};
use hl7::{ClinicalNote, LabResult, Order, ValueType, DIAGNOSTIC_SERV_ID_MDOC};
use labsim_types::{CodedElement, NullTime};
use rand::Rng;
use std::sync::Arc;

/// The lifecycle engine.
///
/// Collaborators are shared read-only; one generator may serve concurrent calls for different
/// orders. Calls that build on the same prior order must be serialised by the caller.
pub struct OrderGenerator {
    config: MessageConfig,
    profiles: Arc<dyn OrderProfileLookup + Send + Sync>,
    doctors: Arc<dyn DoctorRegistry + Send + Sync>,
    notes: Arc<dyn NoteGenerator + Send + Sync>,
    placer_ids: Arc<dyn IdGenerator + Send + Sync>,
    filler_ids: Arc<dyn IdGenerator + Send + Sync>,
}

/// An order profile identity, with its reference data when the profile is known.
struct ResolvedProfile<'a> {
    name: &'a str,
    identity: CodedElement,
    profile: Option<&'a OrderProfile>,
}

/// Per-call state shared by every result built in one `set_results` call.
struct ResultContext<'a> {
    profile: &'a ResolvedProfile<'a>,
    collected: NullTime,
    status: &'a str,
}

impl OrderGenerator {
    pub fn new(
        config: MessageConfig,
        profiles: Arc<dyn OrderProfileLookup + Send + Sync>,
        doctors: Arc<dyn DoctorRegistry + Send + Sync>,
        notes: Arc<dyn NoteGenerator + Send + Sync>,
        placer_ids: Arc<dyn IdGenerator + Send + Sync>,
        filler_ids: Arc<dyn IdGenerator + Send + Sync>,
    ) -> Self {
        Self {
            config,
            profiles,
            doctors,
            notes,
            placer_ids,
            filler_ids,
        }
    }

    pub fn config(&self) -> &MessageConfig {
        &self.config
    }

    /// Places a new order.
    ///
    /// The order gets a placer number, `now` as its order time and the configured in-process
    /// status unless `spec` overrides it. Collection, receipt and report times stay empty.
    pub fn new_order<R>(&self, spec: &OrderSpec, now: DateTime<Utc>, rng: &mut R) -> Order
    where
        R: Rng,
    {
        let resolved = self.resolve_profile(&spec.order_profile, rng);
        Order {
            order_profile: Some(resolved.identity),
            placer: self.placer_ids.new_id(),
            order_date_time: NullTime::valid(now),
            order_control: self.config.order_control().new.clone(),
            order_status: override_or(&spec.order_status, &self.config.order_status().in_process),
            ..Order::default()
        }
    }

    /// Reports results, either on `existing` or on a fresh order.
    ///
    /// # Arguments
    ///
    /// * `existing` - Order returned by an earlier call, if any. It is not modified.
    /// * `spec` - The results to report. With no results listed, one random normal result is
    ///   reported per test in the profile.
    /// * `report_time` - Report time; also the default collection and receipt time.
    /// * `rng` - Random source for profile selection and value sampling.
    ///
    /// # Returns
    ///
    /// The order with its results merged: results of `existing` for other tests are kept and
    /// results for the same test are replaced in place.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError`] if:
    /// - a test is not defined in a known profile,
    /// - a reference range cannot be parsed,
    /// - the report time precedes the order time.
    pub fn set_results<R>(
        &self,
        existing: Option<&Order>,
        spec: &ResultsSpec,
        report_time: DateTime<Utc>,
        rng: &mut R,
    ) -> OrderResult<Order>
    where
        R: Rng,
    {
        // A random profile on an existing order means the profile that order was placed with.
        let profile_name = match existing.and_then(|o| o.order_profile.as_ref()) {
            Some(identity) if spec.order_profile == RANDOM => identity.text.as_str(),
            _ => spec.order_profile.as_str(),
        };
        let resolved = self.resolve_profile(profile_name, rng);

        let mut order = match existing {
            Some(existing) => existing.clone(),
            None => Order {
                order_control: self.config.order_control().new.clone(),
                ..Order::default()
            },
        };
        if order.order_profile.is_none() {
            order.order_profile = Some(resolved.identity.clone());
        }
        if order.placer.is_empty() {
            order.placer = self.placer_ids.new_id();
        }
        if order.filler.is_empty() {
            order.filler = self.filler_ids.new_id();
        }

        let reported = NullTime::valid(report_time);
        if !order.order_date_time.is_valid() {
            order.order_date_time = reported;
        }
        order.collected_date_time =
            resolve_date(spec.collected_date_time, order.collected_date_time, report_time);
        order.received_in_lab_date_time = resolve_date(
            spec.received_in_lab_date_time,
            order.received_in_lab_date_time,
            report_time,
        );
        order.reported_date_time = reported;
        check_date_order(&order)?;

        let result_status = self.config.result_status();
        let derived_status = match existing {
            Some(prior)
                if prior.results_status == result_status.final_status
                    || prior.results_status == result_status.corrected =>
            {
                result_status.corrected.as_str()
            }
            _ => result_status.final_status.as_str(),
        };
        let status = non_empty(&spec.result_status).unwrap_or(derived_status);

        let random_fill: Vec<ResultSpec>;
        let requested: &[ResultSpec] = if !spec.results.is_empty() {
            &spec.results
        } else {
            random_fill = resolved
                .profile
                .map(|profile| profile.test_types.keys().map(ResultSpec::random).collect())
                .unwrap_or_default();
            &random_fill
        };

        let context = ResultContext {
            profile: &resolved,
            collected: order.collected_date_time,
            status,
        };
        let mut results = Vec::with_capacity(requested.len());
        for request in requested {
            results.push(self.build_result(&context, request, rng)?);
        }

        for result in results {
            match order
                .results
                .iter_mut()
                .find(|prior| same_test(prior, &result))
            {
                Some(slot) => *slot = result,
                None => order.results.push(result),
            }
        }

        order.order_status = override_or(&spec.order_status, &self.config.order_status().completed);
        order.results_status = status.to_string();
        Ok(order)
    }

    /// Builds a clinical-document order holding a new note, or the next revision of the note
    /// carried by `existing`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidInput`] if `existing` does not hold exactly one result
    /// carrying a clinical note, and [`OrderError::NoteGenerator`] if the note generator fails.
    pub fn order_with_clinical_note<R>(
        &self,
        existing: Option<&Order>,
        spec: &ClinicalNoteSpec,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> OrderResult<Order>
    where
        R: Rng,
    {
        let existing_note = existing.map(existing_clinical_note).transpose()?;
        let note = self
            .notes
            .random_document_for_clinical_note(spec, existing_note, now)
            .map_err(|source| OrderError::NoteGenerator {
                operation: "order_with_clinical_note",
                source,
            })?;

        let ordering_provider = self.doctors.random(rng).cloned();
        if ordering_provider.is_none() {
            tracing::warn!(
                document_id = %note.document_id,
                "doctor registry is empty; clinical note order has no ordering provider"
            );
        }

        Ok(Order {
            order_profile: Some(
                CodedElement::uncoded(note.document_type.as_str())
                    .with_alternate_text(note.document_title.as_str()),
            ),
            results: vec![LabResult {
                clinical_note: Some(note),
                ..LabResult::default()
            }],
            results_status: self.config.result_status().authenticated_verified.clone(),
            diagnostic_serv_id: DIAGNOSTIC_SERV_ID_MDOC.to_string(),
            ordering_provider,
            ..Order::default()
        })
    }

    fn resolve_profile<'a, R>(&'a self, name: &'a str, rng: &mut R) -> ResolvedProfile<'a>
    where
        R: Rng,
    {
        let profile = if name == RANDOM {
            self.profiles.random_profile(rng)
        } else {
            self.profiles.resolve(name)
        };
        match profile {
            Some(profile) => ResolvedProfile {
                name: profile.identity.text.as_str(),
                identity: profile.identity.clone(),
                profile: Some(profile),
            },
            None => {
                tracing::debug!(order_profile = name, "unknown order profile, sending it uncoded");
                ResolvedProfile {
                    name,
                    identity: CodedElement::uncoded(name),
                    profile: None,
                }
            }
        }
    }

    fn build_result<R>(
        &self,
        context: &ResultContext<'_>,
        request: &ResultSpec,
        rng: &mut R,
    ) -> OrderResult<LabResult>
    where
        R: Rng,
    {
        let test_name = request.test_name.as_str();
        let test_type = match context.profile.profile {
            Some(profile) => Some(profile.test_type(test_name).ok_or_else(|| {
                OrderError::UnknownTest {
                    order_profile: context.profile.name.to_string(),
                    test_name: test_name.to_string(),
                }
            })?),
            None => None,
        };

        let identity = match test_type {
            Some(test_type) => test_type.identity.clone(),
            None if request.id.is_empty() => CodedElement::uncoded(test_name),
            None => CodedElement {
                id: request.id.clone(),
                text: test_name.to_string(),
                ..CodedElement::default()
            },
        };

        let range_text = if request.reference_range.is_empty() {
            test_type
                .map(|t| t.reference_range.clone())
                .unwrap_or_default()
        } else {
            request.reference_range.clone()
        };
        let range = if range_text.trim().is_empty() {
            None
        } else {
            Some(ReferenceRange::parse(&range_text).map_err(|source| {
                OrderError::InvalidRange {
                    test_name: test_name.to_string(),
                    source,
                }
            })?)
        };

        let (value, unit) = match &request.value {
            ValueRequest::Literal(value) => (value.clone(), request.unit.clone()),
            ValueRequest::Empty => (String::new(), request.unit.clone()),
            ValueRequest::Random(zone) => {
                let value = random_value(test_name, *zone, range.as_ref(), test_type, rng);
                let unit = if request.unit.is_empty() {
                    test_type.map(|t| t.unit.clone()).unwrap_or_default()
                } else {
                    request.unit.clone()
                };
                (value, unit)
            }
        };

        let value_type = match test_type.and_then(|t| t.value_type.as_ref()) {
            Some(ValueType::CodedEntry) => Some(ValueType::CodedEntry),
            _ => infer_value_type(&value),
        };
        let abnormal_flag = self.abnormal_flag(
            &request.abnormal_flag,
            &value,
            value_type.as_ref(),
            range.as_ref(),
        );

        let offset = request
            .observation_date_time_offset
            .unwrap_or_else(Duration::zero);
        let notes = match &request.notes {
            Some(notes) => notes.clone(),
            None => self.notes.random_notes_for_result(),
        };

        Ok(LabResult {
            test_name: Some(identity),
            value,
            unit,
            value_type,
            range: range_text,
            abnormal_flag,
            observation_date_time: context.collected.offset_by(offset),
            status: override_or(&request.result_status, context.status),
            notes,
            clinical_note: None,
        })
    }

    fn abnormal_flag(
        &self,
        request: &FlagRequest,
        value: &str,
        value_type: Option<&ValueType>,
        range: Option<&ReferenceRange>,
    ) -> String {
        let flags = self.config.abnormal_flags();
        match request {
            FlagRequest::Literal(flag) => flag.clone(),
            FlagRequest::High => flags.above_high_normal.clone(),
            FlagRequest::Low => flags.below_low_normal.clone(),
            FlagRequest::Normal => flags.normal.clone(),
            FlagRequest::Compute => {
                let (Some(ValueType::Numeric), Some(range)) = (value_type, range) else {
                    return String::new();
                };
                let Ok(number) = value.trim().parse::<f64>() else {
                    return String::new();
                };
                match range.classify(number) {
                    Classification::AboveHigh => flags.above_high_normal.clone(),
                    Classification::BelowLow => flags.below_low_normal.clone(),
                    Classification::Normal | Classification::Unknown => String::new(),
                }
            }
        }
    }
}

/// Draws a random value, falling back to the test's default value for a normal request on a
/// range that cannot be sampled. Returns an empty value if neither is possible.
fn random_value<R>(
    test_name: &str,
    zone: Zone,
    range: Option<&ReferenceRange>,
    test_type: Option<&TestType>,
    rng: &mut R,
) -> String
where
    R: Rng,
{
    let sampled = match range {
        Some(range) if range.is_numeric() => match range.sample(zone, rng) {
            Ok(value) => return value,
            Err(err) => err.to_string(),
        },
        Some(_) => "reference range is not numeric".to_string(),
        None => "no reference range".to_string(),
    };

    match test_type {
        Some(test_type) if zone == Zone::Normal && !test_type.default_value.is_empty() => {
            test_type.default_value.clone()
        }
        _ => {
            tracing::warn!(
                test_name,
                reason = %sampled,
                "cannot generate a random value, sending an empty value"
            );
            String::new()
        }
    }
}

/// `NM` for a finite number, `TX` for other text, `None` for an empty value.
fn infer_value_type(value: &str) -> Option<ValueType> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else if value.parse::<f64>().is_ok_and(f64::is_finite) {
        Some(ValueType::Numeric)
    } else {
        Some(ValueType::Text)
    }
}

fn resolve_date(request: DateRequest, current: NullTime, report_time: DateTime<Utc>) -> NullTime {
    match request {
        DateRequest::Empty => NullTime::invalid(),
        DateRequest::Midnight => NullTime::midnight(report_time),
        DateRequest::Default if current.is_valid() => current,
        DateRequest::Default => NullTime::valid(report_time),
    }
}

/// Checks order ≤ collected ≤ received ≤ reported across the times that are set.
fn check_date_order(order: &Order) -> OrderResult<()> {
    let times = [
        ("order", order.order_date_time),
        ("collected", order.collected_date_time),
        ("received in lab", order.received_in_lab_date_time),
        ("reported", order.reported_date_time),
    ];
    let set: Vec<_> = times
        .iter()
        .filter_map(|(name, time)| time.time().map(|t| (*name, t)))
        .collect();
    for pair in set.windows(2) {
        let ((earlier_name, earlier), (later_name, later)) = (pair[0], pair[1]);
        if later < earlier {
            return Err(OrderError::InvalidInput(format!(
                "{later_name} time {later} precedes {earlier_name} time {earlier}"
            )));
        }
    }
    Ok(())
}

fn existing_clinical_note(order: &Order) -> OrderResult<&ClinicalNote> {
    match order.results.as_slice() {
        [only] => only.clinical_note.as_ref().ok_or_else(|| {
            OrderError::InvalidInput("existing order result does not carry a clinical note".into())
        }),
        results => Err(OrderError::InvalidInput(format!(
            "existing clinical note order must have exactly one result, found {}",
            results.len()
        ))),
    }
}

fn same_test(a: &LabResult, b: &LabResult) -> bool {
    a.test_name.as_ref().map(|t| t.text.as_str()) == b.test_name.as_ref().map(|t| t.text.as_str())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

fn override_or(value: &Option<String>, fallback: &str) -> String {
    non_empty(value).unwrap_or(fallback).to_string()
}
