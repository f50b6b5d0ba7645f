use serde::{Deserialize, Serialize};

use crate::Task;

/// Number of labels in [`TaskQueue::default_labels`].
pub const DEFAULT_LABELS_LEN: usize = 78;

const VARIANTS_PER_LETTER: u8 = 3;

/// Ordered, read-only sequence of tasks known in full before dispatch.
///
/// Insertion order is the dispatch (submission) order. It says nothing about
/// start or completion order once tasks run concurrently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskQueue {
    tasks: Vec<Task>,
}

impl TaskQueue {
    /// Build a queue from plain labels, keeping their order.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tasks: labels.into_iter().map(Task::new).collect(),
        }
    }

    /// The built-in work list: `a1, a2, a3, b1, ... z3`.
    pub fn default_labels() -> Self {
        let labels = (b'a'..=b'z').flat_map(|letter| {
            (1..=VARIANTS_PER_LETTER).map(move |n| format!("{}{}", letter as char, n))
        });
        Self::from_labels(labels)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }
}

impl<'a> IntoIterator for &'a TaskQueue {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}
