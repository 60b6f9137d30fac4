use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::chat::UserId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task number {number} is out of range (user has {len} tasks)")]
    InvalidIndex { number: usize, len: usize },
    #[error("task number is missing or not numeric")]
    MissingIndex,
}

/// Per-user ordered task sequences.
///
/// A task has no identity beyond its position: display index, deletion key and
/// storage order are the same thing. Sequences are created lazily on the first
/// add and are never dropped, so a user who removed everything still owns an
/// empty list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: BTreeMap<UserId, Vec<String>>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, user: &UserId, task: impl Into<String>) -> usize {
        let tasks = self.tasks.entry(user.clone()).or_default();
        tasks.push(task.into());
        tasks.len()
    }

    pub fn tasks_for(&self, user: &UserId) -> &[String] {
        self.tasks.get(user).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len_for(&self, user: &UserId) -> usize {
        self.tasks_for(user).len()
    }

    /// Removes the task at a 1-based position, as typed by the user.
    pub fn remove_number(&mut self, user: &UserId, number: usize) -> Result<String, TaskError> {
        let len = self.len_for(user);
        if number == 0 || number > len {
            return Err(TaskError::InvalidIndex { number, len });
        }
        self.remove_at(user, number - 1).ok_or(TaskError::InvalidIndex { number, len })
    }

    /// Removes the task at a 0-based position; `None` when out of range.
    pub fn remove_at(&mut self, user: &UserId, index: usize) -> Option<String> {
        let tasks = self.tasks.get_mut(user)?;
        (index < tasks.len()).then(|| tasks.remove(index))
    }

    pub fn has_tasks(&self, user: &UserId) -> bool {
        !self.tasks_for(user).is_empty()
    }

    /// Every user that has ever added a task, with their current list, in a
    /// stable order.
    pub fn snapshot(&self) -> Vec<(UserId, Vec<String>)> {
        self.tasks.iter().map(|(user, tasks)| (user.clone(), tasks.clone())).collect()
    }

    pub fn user_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Parses the argument of `remove task N`.
pub fn parse_task_number(raw: Option<&str>) -> Result<usize, TaskError> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse::<usize>().ok())
        .ok_or(TaskError::MissingIndex)
}
