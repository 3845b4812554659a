//! Prescription workflow service.
//!
//! Composes the access gate, the prescription lifecycle, and the
//! dispense ledger into the flows the clinical views call. Every
//! mutation is followed by a full re-read of the affected list rather
//! than an incremental client-side patch; consistency comes from
//! re-reading, at the cost of round trips.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::{self, CallerContext, Decision};
use crate::db::repository;
use crate::error::WorkflowError;
use crate::identity::{AuthenticatedUser, IdentityProvider};
use crate::ledger;
use crate::lifecycle::{self, PrescriptionDraft, ValidationError};
use crate::models::enums::Role;
use crate::models::{DispenseEvent, Patient, Prescription, Profile};

/// Pharmacy queue size bound. Exceeding it truncates; it is not an error.
pub const PHARMACY_QUEUE_LIMIT: u32 = 50;

/// A prescription merged with its derived last-dispense time. Read-time
/// projection — never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionWithLastDispense {
    pub prescription: Prescription,
    pub last_dispensed_at: Option<NaiveDateTime>,
}

/// One pharmacy queue row: prescription, patient display name, and the
/// derived last-dispense time.
#[derive(Debug, Clone, Serialize)]
pub struct PharmacyQueueEntry {
    pub prescription: Prescription,
    pub patient_name: String,
    pub last_dispensed_at: Option<NaiveDateTime>,
}

/// Raw patient intake form fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientDraft {
    pub full_name: String,
    /// ISO date (`YYYY-MM-DD`), blank when unknown.
    pub date_of_birth: String,
    pub nhi: String,
}

pub struct PrescriptionWorkflowService<I: IdentityProvider> {
    conn: Connection,
    identity: I,
}

impl<I: IdentityProvider> PrescriptionWorkflowService<I> {
    pub fn new(conn: Connection, identity: I) -> Self {
        Self { conn, identity }
    }

    /// Session entry point, forwarded to the identity provider.
    pub fn sign_in(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, WorkflowError> {
        Ok(self.identity.sign_in(email, password)?)
    }

    pub fn sign_out(&mut self) {
        self.identity.sign_out();
    }

    /// Direct access to the identity provider (registration, session
    /// inspection).
    pub fn identity_mut(&mut self) -> &mut I {
        &mut self.identity
    }

    /// Run the gate for an operation restricted to `allowed` roles.
    /// Nothing protected is fetched before this resolves to Allow.
    fn authorize(&self, allowed: &[Role]) -> Result<CallerContext, WorkflowError> {
        match access::authorize(&self.conn, &self.identity, allowed) {
            Decision::Allow(ctx) => Ok(ctx),
            Decision::Deny(reason) => Err(WorkflowError::Forbidden(reason)),
        }
    }

    // ── Own profile ──────────────────────────────────────

    /// The caller's own profile; any signed-in clinical role.
    pub fn my_profile(&self) -> Result<Profile, WorkflowError> {
        let ctx = self.authorize(&Role::ALL)?;
        repository::get_profile(&self.conn, &ctx.user_id)?.ok_or(WorkflowError::NotFound {
            entity: "profile",
            id: ctx.user_id,
        })
    }

    /// Update the caller's own display name. Role is not settable here:
    /// role changes go through the administrative path only.
    pub fn update_display_name(&self, display_name: &str) -> Result<Profile, WorkflowError> {
        let ctx = self.authorize(&Role::ALL)?;
        repository::update_display_name(&self.conn, &ctx.user_id, display_name.trim())?;
        repository::get_profile(&self.conn, &ctx.user_id)?.ok_or(WorkflowError::NotFound {
            entity: "profile",
            id: ctx.user_id,
        })
    }

    // ── Patients (doctor views) ──────────────────────────

    pub fn create_patient(&self, draft: &PatientDraft) -> Result<Patient, WorkflowError> {
        let ctx = self.authorize(&[Role::Doctor])?;

        let full_name =
            lifecycle::normalize(&draft.full_name).ok_or(ValidationError::FullNameRequired)?;
        let date_of_birth = match draft.date_of_birth.trim() {
            "" => None,
            raw => Some(
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| ValidationError::DateOfBirthInvalid)?,
            ),
        };
        let nhi = lifecycle::normalize(&draft.nhi).map(|n| n.to_uppercase());

        let patient = repository::insert_patient(
            &self.conn,
            &Uuid::new_v4(),
            &full_name,
            date_of_birth,
            nhi.as_deref(),
            &ctx.user_id,
        )?;
        tracing::info!(patient_id = %patient.id, "patient registered");
        Ok(patient)
    }

    pub fn list_patients(&self) -> Result<Vec<Patient>, WorkflowError> {
        self.authorize(&[Role::Doctor])?;
        Ok(repository::list_patients(&self.conn)?)
    }

    pub fn get_patient(&self, patient_id: &Uuid) -> Result<Patient, WorkflowError> {
        self.authorize(&[Role::Doctor])?;
        repository::get_patient(&self.conn, patient_id)?.ok_or_else(|| WorkflowError::NotFound {
            entity: "patient",
            id: patient_id.to_string(),
        })
    }

    // ── Prescriptions (doctor views) ─────────────────────

    /// Prescriptions for one patient, newest-created first, each merged
    /// with its derived last-dispense time. Dispense recency does not
    /// affect the ordering.
    pub fn list_for_patient(
        &self,
        patient_id: &Uuid,
    ) -> Result<Vec<PrescriptionWithLastDispense>, WorkflowError> {
        self.authorize(&[Role::Doctor])?;
        self.fetch_patient_list(patient_id)
    }

    pub fn create_prescription(
        &self,
        patient_id: &Uuid,
        draft: &PrescriptionDraft,
    ) -> Result<Vec<PrescriptionWithLastDispense>, WorkflowError> {
        let ctx = self.authorize(&[Role::Doctor])?;

        if repository::get_patient(&self.conn, patient_id)?.is_none() {
            return Err(WorkflowError::NotFound {
                entity: "patient",
                id: patient_id.to_string(),
            });
        }

        lifecycle::create(&self.conn, patient_id, &ctx, draft)?;
        self.fetch_patient_list(patient_id)
    }

    pub fn stop_prescription(
        &self,
        prescription_id: &Uuid,
    ) -> Result<Vec<PrescriptionWithLastDispense>, WorkflowError> {
        let ctx = self.authorize(&[Role::Doctor])?;
        let rx = lifecycle::stop(&self.conn, prescription_id, &ctx)?;
        self.fetch_patient_list(&rx.patient_id)
    }

    // ── Pharmacy queue (pharmacist views) ────────────────

    pub fn pharmacy_queue(&self) -> Result<Vec<PharmacyQueueEntry>, WorkflowError> {
        self.authorize(&[Role::Pharmacist])?;
        self.fetch_pharmacy_queue()
    }

    pub fn record_dispense(
        &self,
        prescription_id: &Uuid,
    ) -> Result<Vec<PharmacyQueueEntry>, WorkflowError> {
        let ctx = self.authorize(&[Role::Pharmacist])?;
        ledger::record_dispense(&self.conn, prescription_id, &ctx)?;
        self.fetch_pharmacy_queue()
    }

    /// Dispense history for one prescription, newest first.
    pub fn dispense_history(
        &self,
        prescription_id: &Uuid,
    ) -> Result<Vec<DispenseEvent>, WorkflowError> {
        self.authorize(&[Role::Doctor, Role::Pharmacist])?;
        ledger::dispense_history(&self.conn, prescription_id)
    }

    // ── Merged projections ───────────────────────────────

    fn fetch_patient_list(
        &self,
        patient_id: &Uuid,
    ) -> Result<Vec<PrescriptionWithLastDispense>, WorkflowError> {
        let prescriptions = repository::list_prescriptions_for_patient(&self.conn, patient_id)?;
        let ids: Vec<Uuid> = prescriptions.iter().map(|rx| rx.id).collect();
        let times = ledger::latest_dispense_times(&self.conn, &ids)?;

        Ok(prescriptions
            .into_iter()
            .map(|rx| {
                let last_dispensed_at = times.get(&rx.id).copied();
                PrescriptionWithLastDispense {
                    prescription: rx,
                    last_dispensed_at,
                }
            })
            .collect())
    }

    fn fetch_pharmacy_queue(&self) -> Result<Vec<PharmacyQueueEntry>, WorkflowError> {
        let rows =
            repository::recent_prescriptions_with_patient(&self.conn, PHARMACY_QUEUE_LIMIT)?;
        let ids: Vec<Uuid> = rows.iter().map(|(rx, _)| rx.id).collect();
        let times = ledger::latest_dispense_times(&self.conn, &ids)?;

        Ok(rows
            .into_iter()
            .map(|(rx, patient_name)| {
                let last_dispensed_at = times.get(&rx.id).copied();
                PharmacyQueueEntry {
                    prescription: rx,
                    patient_name,
                    last_dispensed_at,
                }
            })
            .collect())
    }
}
