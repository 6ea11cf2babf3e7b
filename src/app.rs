use std::time::Duration;

use log::{debug, error, info, warn};
use time::OffsetDateTime;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    domain::{
        AppState, ConfigError, FormulaError, FuelPlan, FuelPlanError, FuelSequence, LimitReport,
        ProfileBook, ProfileError, SaveOutcome, StationError, StationIndex, UnitSystem,
    },
    ui::components::toast::{ToastKind, Toasts},
    util::{
        assets::{load_template, TemplateError},
        persistence::{JsonStore, StoreError, WEIGHTS_KEY},
    },
};

/// Quiet period after the last change before the limits advisory runs.
pub const LIMITS_CHECK_DELAY: Duration = Duration::from_millis(1000);

/// Last-write-wins debounce for the limits advisory.
///
/// Each `schedule` aborts the pending task and starts a new one that publishes
/// its report after the delay.
pub struct LimitsDebouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<LimitReport>,
}

impl LimitsDebouncer {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<LimitReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                delay,
                pending: None,
                tx,
            },
            rx,
        )
    }

    /// Must be called from within a tokio runtime.
    pub fn schedule(&mut self, report: LimitReport) {
        self.cancel();
        let tx = self.tx.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(report);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for LimitsDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// The single owner of the calculator state, its storage and notifications.
pub struct Session {
    pub state: AppState,
    pub profiles: ProfileBook,
    pub toasts: Toasts,
    store: JsonStore,
    debouncer: LimitsDebouncer,
    reports: mpsc::UnboundedReceiver<LimitReport>,
}

impl Session {
    /// Restores saved weights, station names and profiles. Storage problems are
    /// reported and the session continues with defaults.
    pub fn open(store: JsonStore) -> Self {
        let (debouncer, reports) = LimitsDebouncer::new(LIMITS_CHECK_DELAY);
        let mut session = Self {
            state: AppState::default(),
            profiles: ProfileBook::default(),
            toasts: Toasts::default(),
            store,
            debouncer,
            reports,
        };

        let weights = match session.store.load_weights() {
            Ok(weights) => weights.unwrap_or_default(),
            Err(err) => {
                session.storage_failed("load saved weights", &err);
                Vec::new()
            }
        };
        let names = match session.store.load_station_names() {
            Ok(names) => names,
            Err(err) => {
                session.storage_failed("load station names", &err);
                None
            }
        };
        session.state.apply_persisted(&weights, names.as_ref());
        match session.store.load_profiles() {
            Ok(profiles) => {
                session.profiles = ProfileBook::new(profiles);
                debug!("loaded {} profiles", session.profiles.len());
            }
            Err(err) => session.storage_failed("load aircraft profiles", &err),
        }
        session
    }

    fn storage_failed(&mut self, action: &str, err: &StoreError) {
        error!("failed to {action}: {err}");
        self.toasts
            .push(ToastKind::Warning, format!("Could not {action}: {err}"));
    }

    /// Recompute trigger: the advisory is rescheduled against the current state.
    pub fn recalculate(&mut self) {
        self.debouncer.schedule(self.state.limit_report());
    }

    fn persist_weights(&mut self) {
        if let Err(err) = self.store.save_weights(&self.state.to_persisted()) {
            self.storage_failed("save weights", &err);
        }
    }

    fn persist_station_names(&mut self) {
        let names = self.state.custom_station_names();
        if let Err(err) = self.store.save_station_names(&names) {
            self.storage_failed("save station names", &err);
        }
    }

    fn persist_profiles(&mut self) {
        let profiles: Vec<_> = self.profiles.iter().cloned().collect();
        if let Err(err) = self.store.save_profiles(&profiles) {
            self.storage_failed("save aircraft profiles", &err);
        }
    }

    fn changed(&mut self) {
        self.persist_weights();
        self.recalculate();
    }

    pub fn set_weight(&mut self, index: StationIndex, weight: f64) -> Result<(), StationError> {
        if let Some(warning) = self.state.set_weight(index, weight)? {
            self.toasts.push(ToastKind::Warning, warning.to_string());
        }
        self.changed();
        Ok(())
    }

    pub fn set_arm(&mut self, index: StationIndex, arm: f64) -> Result<(), StationError> {
        self.state.set_arm(index, arm)?;
        self.changed();
        Ok(())
    }

    pub fn clear_weights(&mut self) {
        self.state.clear_weights();
        self.changed();
    }

    /// Drops the stored weights. The current loading is left as is.
    pub fn forget_saved_weights(&mut self) {
        match self.store.remove(WEIGHTS_KEY) {
            Ok(_) => {
                self.toasts
                    .push(ToastKind::Success, "Saved data cleared successfully");
            }
            Err(err) => self.storage_failed("clear saved data", &err),
        }
    }

    pub fn rename_station(&mut self, index: StationIndex, name: &str) -> Result<(), StationError> {
        self.state.rename_station(index, name)?;
        self.persist_station_names();
        self.toasts.push(
            ToastKind::Success,
            format!("Station {index} renamed to {}", name.trim()),
        );
        Ok(())
    }

    pub fn reset_station_names(&mut self) {
        self.state.reset_station_names();
        self.persist_station_names();
        self.toasts
            .push(ToastKind::Info, "Station names reset to defaults");
    }

    pub fn set_unit(&mut self, unit: UnitSystem) {
        if self.state.set_unit(unit) {
            self.changed();
        }
    }

    pub fn apply_formula(&mut self, text: &str) -> Result<f64, FormulaError> {
        match self.state.apply_formula(text) {
            Ok(value) => {
                self.recalculate();
                Ok(value)
            }
            Err(err) => {
                self.toasts
                    .push(ToastKind::Error, format!("Invalid formula: {err}"));
                Err(err)
            }
        }
    }

    pub fn set_mac_limits(&mut self, min: f64, max: f64) -> Result<(), ConfigError> {
        self.state.set_mac_limits(min, max)?;
        self.recalculate();
        Ok(())
    }

    pub fn reset_mac_defaults(&mut self) {
        self.state.reset_mac_defaults();
        self.recalculate();
    }

    pub fn load_template(&mut self, key: &str) -> Result<(), TemplateError> {
        let template = load_template(key)?;
        info!("loading template {key} ({})", template.name);
        self.state.load_aircraft(
            template.name.clone(),
            template.mac_config,
            template.stations,
            UnitSystem::Imperial,
        );
        self.toasts.push(
            ToastKind::Success,
            format!("Template \"{}\" loaded successfully", template.name),
        );
        self.changed();
        Ok(())
    }

    pub fn save_profile(
        &mut self,
        name: &str,
        description: &str,
        overwrite: bool,
    ) -> Result<SaveOutcome, ProfileError> {
        let profile = self
            .state
            .snapshot_profile(name, description, OffsetDateTime::now_utc());
        let outcome = self.profiles.save(profile, overwrite)?;
        self.persist_profiles();
        self.toasts.push(
            ToastKind::Success,
            format!("Profile \"{}\" saved", name.trim()),
        );
        Ok(outcome)
    }

    pub fn load_profile(&mut self, name: &str) -> Result<(), ProfileError> {
        let profile = self
            .profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;
        if let Some(err) = self.state.load_profile(&profile) {
            self.toasts.push(
                ToastKind::Warning,
                format!("Profile formula ignored ({err}); keeping the current formula"),
            );
        }
        self.toasts
            .push(ToastKind::Success, format!("Loaded profile: {}", profile.name));
        self.changed();
        Ok(())
    }

    pub fn delete_profile(&mut self, name: &str) -> Result<(), ProfileError> {
        self.profiles.delete(name)?;
        self.persist_profiles();
        Ok(())
    }

    pub fn duplicate_profile(
        &mut self,
        name: &str,
        new_name: Option<&str>,
    ) -> Result<String, ProfileError> {
        let copy = self
            .profiles
            .duplicate(name, new_name, OffsetDateTime::now_utc())?
            .name
            .clone();
        self.persist_profiles();
        Ok(copy)
    }

    pub fn move_fuel_priority(&mut self, dragged: StationIndex, target: StationIndex) -> bool {
        self.state.move_fuel_priority(dragged, target)
    }

    /// Back to consuming the tanks in station order.
    pub fn reset_fuel_priorities(&mut self) {
        self.state.reset_fuel_priorities();
        self.toasts
            .push(ToastKind::Info, "Fuel tank order reset to defaults");
    }

    /// Runs the burn-down; with `apply` the landing fuel becomes the reserve.
    pub fn plan_fuel(
        &mut self,
        plan: &FuelPlan,
        apply: bool,
    ) -> Result<FuelSequence, FuelPlanError> {
        let sequence = self.state.simulate_fuel(plan);
        if sequence.is_short() {
            self.toasts.push(
                ToastKind::Warning,
                format!(
                    "Insufficient fuel: need {:.1}, available {:.1}",
                    sequence.total_needed, sequence.total_available
                ),
            );
        }
        if apply {
            self.state.apply_fuel_burn(plan)?;
            self.toasts.push(
                ToastKind::Success,
                "Fuel burn applied. Landing fuel updated to reserves only.",
            );
            self.changed();
        }
        Ok(sequence)
    }

    /// Waits for the pending advisory, if any, and queues it as a notification.
    pub async fn flush(&mut self) -> Option<LimitReport> {
        if !self.debouncer.is_pending() && self.reports.is_empty() {
            return None;
        }
        let report = self.reports.recv().await?;
        match report.summary() {
            Some(text) if report.all_clear() => {
                self.toasts.push(ToastKind::Success, text);
            }
            Some(text) => {
                warn!("{text}");
                self.toasts.push(ToastKind::Error, text);
            }
            None => {}
        }
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::limits::LimitIssue;
    use approx::assert_relative_eq;

    fn session() -> (tempfile::TempDir, Session) {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::open(JsonStore::with_root(dir.path()));
        (dir, session)
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_keeps_only_the_last_trigger() {
        let (mut debouncer, mut rx) = LimitsDebouncer::new(LIMITS_CHECK_DELAY);
        for total in [1.0, 2.0, 3.0] {
            debouncer.schedule(LimitReport {
                total_weight: total,
                issues: Vec::new(),
            });
            tokio::time::sleep(Duration::from_millis(400)).await;
        }
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(700)).await;
        let report = rx.recv().await.unwrap();
        assert_eq!(report.total_weight, 3.0);
        assert!(rx.try_recv().is_err());
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_the_pending_check() {
        let (mut debouncer, mut rx) = LimitsDebouncer::new(LIMITS_CHECK_DELAY);
        debouncer.schedule(LimitReport::default());
        debouncer.cancel();
        tokio::time::sleep(LIMITS_CHECK_DELAY * 2).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn overweight_is_flagged_after_quiet_period() {
        let (_dir, mut session) = session();
        session.set_weight(1, 59_000.0).unwrap();
        session.set_weight(11, 2_000.0).unwrap();

        let report = session.flush().await.unwrap();
        assert!(report.issues.contains(&LimitIssue::Overweight { total: 61_000.0 }));
        let last = session.toasts.iter().last().unwrap();
        assert_eq!(last.kind, ToastKind::Error);
        assert!(last.text.starts_with("FLIGHT SAFETY ALERT"));
        assert!(session.flush().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn weights_and_names_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut session = Session::open(JsonStore::with_root(dir.path()));
            session.set_weight(2, 160.0).unwrap();
            session.rename_station(8, "Mail").unwrap();
            session.save_profile("A319", "", false).unwrap();
        }
        let session = Session::open(JsonStore::with_root(dir.path()));
        assert_eq!(session.state.station(2).unwrap().weight, 160.0);
        assert_eq!(session.state.station(8).unwrap().description, "Mail");
        assert!(session.profiles.contains("A319"));
    }

    #[tokio::test(start_paused = true)]
    async fn metric_runs_leave_stored_weights_alone() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut session = Session::open(JsonStore::with_root(dir.path()));
            session.set_weight(1, 1_000.0).unwrap();
        }
        for _ in 0..2 {
            let mut session = Session::open(JsonStore::with_root(dir.path()));
            session.set_unit(UnitSystem::Metric);
            let basic = session.state.station(1).unwrap();
            assert_relative_eq!(basic.weight, 453.59237, epsilon = 1e-9);
        }

        let session = Session::open(JsonStore::with_root(dir.path()));
        assert_eq!(session.state.unit, UnitSystem::Imperial);
        assert_relative_eq!(session.state.station(1).unwrap().weight, 1_000.0, epsilon = 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn weight_entered_in_kilograms_reloads_in_pounds() {
        let (dir, mut session) = session();
        session.set_unit(UnitSystem::Metric);
        session.set_weight(2, 100.0).unwrap();

        let reopened = Session::open(JsonStore::with_root(dir.path()));
        let weight = reopened.state.station(2).unwrap().weight;
        assert_relative_eq!(weight, 100.0 / crate::domain::entities::LB_TO_KG, epsilon = 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn fuel_order_can_be_reset() {
        let (_dir, mut session) = session();
        assert!(session.move_fuel_priority(12, 11));
        assert_eq!(session.state.fuel_priorities[0].station_index, 12);

        session.reset_fuel_priorities();
        assert_eq!(session.state.fuel_priorities[0].station_index, 11);
        assert_eq!(session.toasts.iter().last().unwrap().kind, ToastKind::Info);
    }

    #[tokio::test(start_paused = true)]
    async fn forget_clears_only_stored_weights() {
        let (dir, mut session) = session();
        session.set_weight(2, 160.0).unwrap();
        session.forget_saved_weights();
        assert_eq!(session.state.station(2).unwrap().weight, 160.0);

        let reopened = Session::open(JsonStore::with_root(dir.path()));
        assert_eq!(reopened.state.station(2).unwrap().weight, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn corrupt_storage_becomes_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("weightBalanceData.json"), "[{").unwrap();
        let session = Session::open(JsonStore::with_root(dir.path()));
        let toast = session.toasts.iter().next().unwrap();
        assert_eq!(toast.kind, ToastKind::Warning);
        assert!(toast.text.starts_with("Could not load saved weights"));
        assert_eq!(session.state.stations.len(), 13);
    }

    #[tokio::test(start_paused = true)]
    async fn template_then_profile_round_trip() {
        let (_dir, mut session) = session();
        session.set_unit(UnitSystem::Metric);
        session.load_template("cessna172").unwrap();
        assert_eq!(session.state.unit, UnitSystem::Imperial);
        assert_eq!(session.state.stations.len(), 8);

        assert_eq!(session.save_profile("N12345", "club", false), Ok(SaveOutcome::Created));
        assert!(matches!(
            session.save_profile("N12345", "club", false),
            Err(ProfileError::AlreadyExists(_))
        ));
        let copy = session.duplicate_profile("N12345", None).unwrap();
        assert_eq!(copy, "N12345 (Copy)");

        session.load_template("airbus319").unwrap();
        session.load_profile("N12345").unwrap();
        assert_eq!(session.state.stations.len(), 8);
        assert_eq!(session.state.mac.mac_max, 38.0);

        session.delete_profile("N12345").unwrap();
        assert!(!session.profiles.contains("N12345"));
    }

    #[tokio::test(start_paused = true)]
    async fn fuel_plan_applies_reserve() {
        let (_dir, mut session) = session();
        session.set_weight(11, 300.0).unwrap();
        let plan = FuelPlan::new(1.0, 100.0, 150.0).unwrap();
        let sequence = session.plan_fuel(&plan, true).unwrap();
        assert_eq!(sequence.steps.len(), 1);
        assert_eq!(session.state.station(13).unwrap().weight, 150.0);
    }
}
