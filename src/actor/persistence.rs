//! Saving and restoring the floating-window session.
//!
//! Writes are debounced against a deadline that the reactor polls after
//! every event. Restoration is a per-window state machine advanced by the
//! host's render-settled signal:
//!
//! 1. on open the saved scale is applied against the computed viewport
//!    ([`RestorePhase::ScaleApplied`]);
//! 2. on the first settle the scale is re-applied against the measured
//!    viewport and the saved scroll is written ([`RestorePhase::ScrollApplied`]);
//! 3. on the second settle the lock flag is applied
//!    ([`RestorePhase::LockApplied`]), after the surface has echoed back
//!    its scroll notifications.
//!
//! Nothing is written while a restore is in flight. Once every window has
//! reached the last phase the session is saved once.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::common::collections::BTreeMap;
use crate::common::config::PersistenceSettings;
use crate::layout_engine::{WindowError, WindowManager};
use crate::model::window::{ContentId, WindowSnapshot};
use crate::sys::store::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RestorePhase {
    ScaleApplied,
    ScrollApplied,
    LockApplied,
}

/// One record read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SavedWindow {
    Snapshot(WindowSnapshot),
    /// The record was unreadable but named its content; open with defaults.
    Defaults(ContentId),
}

#[derive(Debug)]
struct RestoreTask {
    snapshot: WindowSnapshot,
    phase: RestorePhase,
}

pub struct PersistenceAdapter {
    store: Box<dyn KeyValueStore>,
    key: String,
    debounce: Duration,
    deadline: Option<Instant>,
    restoring: bool,
    tasks: BTreeMap<ContentId, RestoreTask>,
}

impl PersistenceAdapter {
    pub fn new(settings: &PersistenceSettings, store: Box<dyn KeyValueStore>) -> Self {
        PersistenceAdapter {
            store,
            key: settings.storage_key.clone(),
            debounce: settings.debounce,
            deadline: None,
            restoring: false,
            tasks: BTreeMap::new(),
        }
    }

    pub fn is_restoring(&self) -> bool { self.restoring }

    pub fn restore_phase(&self, id: &ContentId) -> Option<RestorePhase> {
        self.tasks.get(id).map(|task| task.phase)
    }

    pub fn has_pending_save(&self) -> bool { self.deadline.is_some() }

    pub fn serialize(&self, wm: &WindowManager) -> Vec<WindowSnapshot> { wm.snapshots() }

    pub fn save_now(&mut self, wm: &WindowManager) -> anyhow::Result<()> {
        self.deadline = None;
        let snapshots = self.serialize(wm);
        let json = serde_json::to_string(&snapshots)?;
        self.store.set(&self.key, &json)?;
        debug!(windows = snapshots.len(), "saved floating windows");
        Ok(())
    }

    /// Pushes the pending write out to `now + debounce`.
    pub fn schedule_save(&mut self, now: Instant) {
        if self.restoring {
            trace!("save suppressed while restoring");
            return;
        }
        self.deadline = Some(now + self.debounce);
    }

    /// Performs the pending write if its deadline has passed and nothing is
    /// holding it back. Returns whether a write happened.
    pub fn poll(&mut self, now: Instant, wm: &WindowManager, gesture_active: bool) -> bool {
        let Some(deadline) = self.deadline else { return false };
        if now < deadline || self.restoring || gesture_active {
            return false;
        }
        if let Err(e) = self.save_now(wm) {
            warn!("saving floating windows failed: {e:#}");
        }
        true
    }

    /// Writes any pending save immediately.
    pub fn flush(&mut self, wm: &WindowManager) -> anyhow::Result<()> {
        if self.deadline.is_some() && !self.restoring {
            self.save_now(wm)?;
        }
        Ok(())
    }

    /// Reads the saved session. Unreadable data never fails the caller:
    /// corrupt records are skipped, or fall back to defaults when they at
    /// least name their content.
    pub fn load(&self) -> Vec<SavedWindow> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("reading saved windows failed: {e:#}");
                return Vec::new();
            }
        };
        let records = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(records)) => records,
            Ok(other) => {
                warn!(kind = ?value_kind(&other), "saved windows are not a list, ignoring");
                return Vec::new();
            }
            Err(e) => {
                warn!("saved windows are not valid JSON, ignoring: {e}");
                return Vec::new();
            }
        };

        let mut out = Vec::new();
        for record in records {
            let content_id = record.get("contentId").and_then(Value::as_str).map(ContentId::from);
            let parsed = serde_json::from_value::<WindowSnapshot>(record)
                .map_err(|e| e.to_string())
                .and_then(|snapshot| {
                    snapshot.validate().map_err(|e| e.to_string())?;
                    Ok(snapshot)
                });
            match (parsed, content_id) {
                (Ok(snapshot), _) => out.push(SavedWindow::Snapshot(snapshot)),
                (Err(e), Some(id)) => {
                    warn!(%id, "corrupt window record, using defaults: {e}");
                    out.push(SavedWindow::Defaults(id));
                }
                (Err(e), None) => warn!("dropping unidentifiable window record: {e}"),
            }
        }
        out
    }

    /// Opens every saved window and starts the restore protocol. Scale is
    /// applied right away; scroll and lock wait for render settles.
    pub fn begin_restore(&mut self, wm: &mut WindowManager, saved: Vec<SavedWindow>, now: Instant) {
        self.deadline = None;
        self.restoring = true;
        let mut opened_defaults = false;

        for record in saved {
            match record {
                SavedWindow::Defaults(id) => match wm.open(&id, None) {
                    Ok(()) => opened_defaults = true,
                    Err(e) => warn!(%id, "cannot reopen window: {e}"),
                },
                SavedWindow::Snapshot(snapshot) => {
                    let id = snapshot.content_id.clone();
                    if let Err(e) = wm.open(&id, Some(&snapshot)) {
                        warn!(%id, "cannot restore window: {e}");
                        continue;
                    }
                    match snapshot.validate_view().and_then(|()| wm.apply_scale(&id, snapshot.scale)) {
                        Ok(()) => {
                            debug!(%id, scale = snapshot.scale, "restore: scale applied");
                            self.tasks.insert(id, RestoreTask {
                                snapshot,
                                phase: RestorePhase::ScaleApplied,
                            });
                        }
                        Err(e) => error!(%id, "restore aborted while applying scale: {e}"),
                    }
                }
            }
        }

        if self.tasks.is_empty() {
            self.restoring = false;
            if opened_defaults {
                self.deadline = Some(now + self.debounce);
            }
        }
    }

    /// Advances every restoring window by one phase. Finishes the restore
    /// once all of them have their lock applied; the restored session is
    /// then due for saving at `now`, subject to the usual gesture check in
    /// [`Self::poll`].
    pub fn on_render_settled(&mut self, wm: &mut WindowManager, now: Instant) {
        if !self.restoring {
            return;
        }
        let mut aborted = Vec::new();
        for (id, task) in self.tasks.iter_mut() {
            if let Err(e) = advance(wm, id, task) {
                error!(%id, phase = ?task.phase, "restore aborted: {e}");
                aborted.push(id.clone());
            }
        }
        for id in aborted {
            self.tasks.remove(&id);
        }

        if self.tasks.values().all(|task| task.phase == RestorePhase::LockApplied) {
            self.tasks.clear();
            self.restoring = false;
            debug!("restore finished");
            self.deadline = Some(now);
        }
    }

    /// Drops the restore task of a window that was closed mid-restore.
    pub fn forget(&mut self, id: &ContentId) {
        if self.tasks.remove(id).is_some() {
            debug!(%id, "restore dropped for closed window");
        }
    }
}

fn advance(wm: &mut WindowManager, id: &ContentId, task: &mut RestoreTask) -> Result<(), WindowError> {
    match task.phase {
        RestorePhase::ScaleApplied => {
            // the viewport is authoritative now that the window was laid out
            wm.apply_scale(id, task.snapshot.scale)?;
            wm.set_scroll(id, task.snapshot.scroll())?;
            task.phase = RestorePhase::ScrollApplied;
        }
        RestorePhase::ScrollApplied => {
            wm.set_locked(id, task.snapshot.locked)?;
            task.phase = RestorePhase::LockApplied;
        }
        RestorePhase::LockApplied => return Ok(()),
    }
    debug!(%id, phase = ?task.phase, "restore phase reached");
    Ok(())
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::{GeometrySettings, HostSettings};
    use crate::sys::geometry::{Point, Size};
    use crate::sys::host::GridCanvas;
    use crate::sys::store::MemoryStore;

    fn setup(store: &MemoryStore) -> (WindowManager, PersistenceAdapter) {
        let host = GridCanvas::from_settings(&HostSettings::default());
        let wm = WindowManager::new(
            &GeometrySettings::default(),
            &HostSettings::default(),
            Box::new(host),
            Size::new(1920.0, 1080.0),
        );
        let persistence =
            PersistenceAdapter::new(&PersistenceSettings::default(), Box::new(store.clone()));
        (wm, persistence)
    }

    #[test]
    fn debounce_waits_for_deadline_and_gestures() {
        let store = MemoryStore::new();
        let (mut wm, mut persistence) = setup(&store);
        wm.open(&ContentId::from("panel-1"), None).unwrap();
        let t0 = Instant::now();

        persistence.schedule_save(t0);
        assert!(!persistence.poll(t0 + Duration::from_millis(499), &wm, false));
        assert!(!persistence.poll(t0 + Duration::from_millis(600), &wm, true));
        assert_eq!(store.writes(), 0);
        assert!(persistence.poll(t0 + Duration::from_millis(600), &wm, false));
        assert_eq!(store.writes(), 1);
        assert!(!persistence.has_pending_save());
    }

    #[test]
    fn rescheduling_pushes_deadline_out() {
        let store = MemoryStore::new();
        let (wm, mut persistence) = setup(&store);
        let t0 = Instant::now();
        persistence.schedule_save(t0);
        persistence.schedule_save(t0 + Duration::from_millis(400));
        assert!(!persistence.poll(t0 + Duration::from_millis(600), &wm, false));
        assert!(persistence.poll(t0 + Duration::from_millis(900), &wm, false));
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn load_skips_corrupt_records() {
        let mut store = MemoryStore::new();
        let (mut wm, mut persistence) = setup(&store);
        wm.open(&ContentId::from("panel-1"), None).unwrap();
        persistence.save_now(&wm).unwrap();
        let saved = store.get("floatpane.windows").unwrap().unwrap();
        let good = saved.trim_start_matches('[').trim_end_matches(']');
        store
            .set(
                "floatpane.windows",
                &format!(r#"[{good}, {{"contentId": "panel-2", "x": "oops"}}, 42, {{"nothing": 1}}]"#),
            )
            .unwrap();

        let loaded = persistence.load();
        assert_eq!(loaded.len(), 2);
        assert!(matches!(&loaded[0], SavedWindow::Snapshot(s) if s.content_id.as_str() == "panel-1"));
        assert_eq!(loaded[1], SavedWindow::Defaults(ContentId::from("panel-2")));
    }

    #[test]
    fn load_tolerates_garbage() {
        let mut store = MemoryStore::new();
        let (_wm, persistence) = setup(&store);
        assert!(persistence.load().is_empty());
        store.set("floatpane.windows", "{not json").unwrap();
        assert!(persistence.load().is_empty());
        store.set("floatpane.windows", r#"{"contentId": "panel-1"}"#).unwrap();
        assert!(persistence.load().is_empty());
    }

    #[test]
    fn restore_advances_one_phase_per_settle() {
        let store = MemoryStore::new();
        let (mut wm, _) = setup(&store);
        let id = ContentId::from("panel-2");
        wm.open(&id, None).unwrap();
        wm.zoom_at(&id, 2.0, Point::ZERO).unwrap();
        wm.set_scroll(&id, Point::new(120.0, 80.0)).unwrap();
        wm.set_locked(&id, true).unwrap();
        let snapshot = wm.window(&id).unwrap().snapshot();

        let (mut fresh, mut persistence_b) = setup(&store);
        let t0 = Instant::now();
        persistence_b.begin_restore(
            &mut fresh,
            vec![SavedWindow::Snapshot(snapshot.clone())],
            t0,
        );
        assert!(persistence_b.is_restoring());
        assert_eq!(persistence_b.restore_phase(&id), Some(RestorePhase::ScaleApplied));
        let window = fresh.window(&id).unwrap();
        assert_eq!(window.scale, snapshot.scale);
        assert_eq!(window.scroll, Point::ZERO);
        assert!(!window.locked);

        // nothing is written while restoring
        persistence_b.schedule_save(Instant::now());
        assert!(!persistence_b.has_pending_save());

        persistence_b.on_render_settled(&mut fresh, t0);
        assert_eq!(persistence_b.restore_phase(&id), Some(RestorePhase::ScrollApplied));
        assert_eq!(fresh.window(&id).unwrap().scroll, Point::new(120.0, 80.0));
        assert!(!fresh.window(&id).unwrap().locked);
        assert_eq!(store.writes(), 0);

        persistence_b.on_render_settled(&mut fresh, t0);
        assert!(!persistence_b.is_restoring());
        assert_eq!(persistence_b.restore_phase(&id), None);
        assert!(fresh.window(&id).unwrap().locked);
        assert!(persistence_b.has_pending_save());
        assert!(persistence_b.poll(t0, &fresh, false));
        assert_eq!(store.writes(), 1);
        assert_eq!(fresh.window(&id).unwrap().snapshot(), snapshot);
    }

    #[test]
    fn final_restore_save_waits_for_gestures() {
        let store = MemoryStore::new();
        let (mut wm, mut persistence) = setup(&store);
        let id = ContentId::from("panel-1");
        wm.open(&id, None).unwrap();
        let saved = vec![SavedWindow::Snapshot(wm.window(&id).unwrap().snapshot())];

        let (mut fresh, _) = setup(&store);
        let t0 = Instant::now();
        persistence.begin_restore(&mut fresh, saved, t0);
        persistence.on_render_settled(&mut fresh, t0);
        persistence.on_render_settled(&mut fresh, t0);
        assert!(!persistence.is_restoring());

        assert!(!persistence.poll(t0, &fresh, true));
        assert_eq!(store.writes(), 0);
        assert!(persistence.has_pending_save());
        assert!(persistence.poll(t0 + Duration::from_millis(10), &fresh, false));
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn load_falls_back_on_out_of_range_z_index() {
        let mut store = MemoryStore::new();
        let (mut wm, persistence) = setup(&store);
        wm.open(&ContentId::from("panel-1"), None).unwrap();
        let mut record = serde_json::to_value(wm.snapshots()).unwrap();
        record[0]["zIndex"] = Value::from(i32::MAX);
        store.set("floatpane.windows", &record.to_string()).unwrap();

        assert_eq!(persistence.load(), vec![SavedWindow::Defaults(ContentId::from("panel-1"))]);
    }

    #[test]
    fn failed_window_does_not_block_the_rest() {
        let store = MemoryStore::new();
        let (mut wm, mut persistence) = setup(&store);
        let ok = ContentId::from("panel-1");
        let bad = ContentId::from("panel-3");
        wm.open(&ok, None).unwrap();
        wm.open(&bad, None).unwrap();
        let good_snapshot = wm.window(&ok).unwrap().snapshot();
        let mut bad_snapshot = wm.window(&bad).unwrap().snapshot();
        bad_snapshot.scale = f64::NAN;

        let (mut fresh, _) = setup(&store);
        persistence.begin_restore(&mut fresh, vec![
            SavedWindow::Snapshot(good_snapshot),
            SavedWindow::Snapshot(bad_snapshot),
        ], Instant::now());
        // the bad window is open with its restored frame but takes no further part
        assert!(fresh.window(&bad).is_some());
        assert_eq!(persistence.restore_phase(&bad), None);
        assert_eq!(persistence.restore_phase(&ok), Some(RestorePhase::ScaleApplied));

        persistence.on_render_settled(&mut fresh, Instant::now());
        persistence.on_render_settled(&mut fresh, Instant::now());
        assert!(!persistence.is_restoring());
    }

    #[test]
    fn closing_mid_restore_aborts_only_that_window() {
        let store = MemoryStore::new();
        let (mut wm, mut persistence) = setup(&store);
        let a = ContentId::from("panel-1");
        let b = ContentId::from("panel-2");
        wm.open(&a, None).unwrap();
        wm.open(&b, None).unwrap();
        let saved = vec![
            SavedWindow::Snapshot(wm.window(&a).unwrap().snapshot()),
            SavedWindow::Snapshot(wm.window(&b).unwrap().snapshot()),
        ];

        let (mut fresh, _) = setup(&store);
        persistence.begin_restore(&mut fresh, saved, Instant::now());
        fresh.close(&a).unwrap();
        persistence.on_render_settled(&mut fresh, Instant::now());
        assert_eq!(persistence.restore_phase(&a), None);
        assert_eq!(persistence.restore_phase(&b), Some(RestorePhase::ScrollApplied));
        persistence.on_render_settled(&mut fresh, Instant::now());
        assert!(!persistence.is_restoring());
        assert_eq!(fresh.len(), 1);
    }
}
