//! Deferred session work (fading wrong notes, hiding hints) driven by the
//! host clock. Nothing fires on its own: the host calls `take_due` with the
//! current time, and the owning session flushes the registry on every reset
//! so no task outlives the attempt that scheduled it.

pub type NoteId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskAction {
    Fade(NoteId),
    Remove(NoteId),
    HideHint,
}

impl TaskAction {
    fn note_id(self) -> Option<NoteId> {
        match self {
            TaskAction::Fade(id) | TaskAction::Remove(id) => Some(id),
            TaskAction::HideHint => None,
        }
    }
}

#[derive(Clone, Debug)]
struct ScheduledTask {
    due: f64,
    seq: u64,
    action: TaskAction,
}

#[derive(Clone, Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<ScheduledTask>,
    next_seq: u64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: f64, action: TaskAction) {
        self.tasks.push(ScheduledTask {
            due,
            seq: self.next_seq,
            action,
        });
        self.next_seq += 1;
    }

    /// Drops every pending task for `note_id`. Returns how many were dropped.
    pub fn cancel_note(&mut self, note_id: NoteId) -> usize {
        self.cancel_where(|action| action.note_id() == Some(note_id))
    }

    pub fn cancel_hint(&mut self) -> usize {
        self.cancel_where(|action| action == TaskAction::HideHint)
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.tasks.len();
        self.tasks.clear();
        count
    }

    fn cancel_where(&mut self, pred: impl Fn(TaskAction) -> bool) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !pred(t.action));
        before - self.tasks.len()
    }

    /// Removes and returns every task due at or before `now`, earliest
    /// first; tasks due at the same instant come out in scheduling order.
    pub fn take_due(&mut self, now: f64) -> Vec<TaskAction> {
        let (mut due, pending): (Vec<ScheduledTask>, Vec<ScheduledTask>) =
            self.tasks.drain(..).partition(|t| t.due <= now);
        self.tasks = pending;
        due.sort_by(|a, b| {
            a.due
                .partial_cmp(&b.due)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.seq.cmp(&b.seq))
        });
        due.into_iter().map(|t| t.action).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Earliest pending deadline, so the host knows when to call back.
    pub fn next_due(&self) -> Option<f64> {
        self.tasks
            .iter()
            .map(|t| t.due)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}
