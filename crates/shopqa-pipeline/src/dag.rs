//! Task graph construction and traversal
//!
//! Keeps forward and reverse edges so both scheduling (levels) and failure
//! handling (everything downstream of a failed task) are cheap.

use crate::tasks::Task;
use crate::PipelineError;
use shopqa_transform::DbtStep;
use std::collections::{HashMap, HashSet, VecDeque};

/// Task identifier (e.g. `ingest_orders`)
pub type TaskId = String;

/// Dependency graph with forward and reverse edges
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    /// Forward edges: task -> tasks it depends on
    parents: HashMap<TaskId, Vec<TaskId>>,

    /// Reverse edges: task -> tasks that depend on it
    children: HashMap<TaskId, Vec<TaskId>>,

    /// Tasks in insertion order, which is also the order within a level
    tasks: Vec<TaskId>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task; adding it twice is a no-op
    pub fn add_task(&mut self, id: impl Into<TaskId>) {
        let id = id.into();
        if !self.contains(&id) {
            self.tasks.push(id);
        }
    }

    /// Make `child` depend on `parent`
    pub fn add_edge(&mut self, parent: &str, child: &str) -> Result<(), PipelineError> {
        for id in [parent, child] {
            if !self.contains(id) {
                return Err(PipelineError::UnknownTask(id.to_string()));
            }
        }

        let parents = self.parents.entry(child.to_string()).or_default();
        if !parents.iter().any(|p| p == parent) {
            parents.push(parent.to_string());
            self.children
                .entry(parent.to_string())
                .or_default()
                .push(child.to_string());
        }
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.iter().any(|t| t == id)
    }

    pub fn tasks(&self) -> &[TaskId] {
        &self.tasks
    }

    /// Immediate dependencies of a task
    pub fn parents(&self, id: &str) -> Vec<&TaskId> {
        self.parents
            .get(id)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Immediate dependents of a task
    pub fn children(&self, id: &str) -> Vec<&TaskId> {
        self.children
            .get(id)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Every task reachable through child edges, nearest first
    ///
    /// This is what gets skipped when `id` fails.
    pub fn downstream(&self, id: &str) -> Vec<TaskId> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<&TaskId> = self.children(id).into_iter().collect();
        let mut result = Vec::new();

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            result.push(current.clone());
            queue.extend(self.children(current).into_iter().filter(|c| !visited.contains(c)));
        }

        result
    }

    /// Topological levels: every task appears after all of its parents, and
    /// tasks sharing a level have no path between them
    pub fn stages(&self) -> Result<Vec<Vec<TaskId>>, PipelineError> {
        let mut in_degree: HashMap<&str, usize> = self
            .tasks
            .iter()
            .map(|t| (t.as_str(), self.parents(t).len()))
            .collect();

        let mut current: Vec<&TaskId> = self
            .tasks
            .iter()
            .filter(|t| in_degree.get(t.as_str()) == Some(&0))
            .collect();
        let mut stages = Vec::new();
        let mut placed = 0;

        // Kahn's algorithm, one level at a time
        while !current.is_empty() {
            let mut next = Vec::new();
            for task in &current {
                for child in self.children(task) {
                    if let Some(degree) = in_degree.get_mut(child.as_str()) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(child);
                        }
                    }
                }
            }
            next.sort_by_key(|t| self.position(t));

            placed += current.len();
            stages.push(current.into_iter().cloned().collect());
            current = next;
        }

        if placed != self.tasks.len() {
            let stuck = self
                .tasks
                .iter()
                .filter(|t| in_degree.get(t.as_str()).is_some_and(|d| *d > 0))
                .cloned()
                .collect();
            return Err(PipelineError::Cycle(stuck));
        }

        Ok(stages)
    }

    fn position(&self, id: &str) -> usize {
        self.tasks.iter().position(|t| t == id).unwrap_or(usize::MAX)
    }
}

/// The daily pipeline graph
///
/// Without `include_transform` the ingest tasks feed validation directly,
/// for runs against staging tables that are maintained elsewhere.
pub fn default_pipeline(include_transform: bool) -> TaskGraph {
    let mut graph = TaskGraph::new();
    let mut add = |task: Task| graph.add_task(task.id());

    add(Task::InitWarehouse);
    for task in Task::INGEST {
        add(task);
    }
    if include_transform {
        for step in DbtStep::ALL {
            add(Task::Dbt(step));
        }
    }
    add(Task::ValidateQuality);
    add(Task::AlertOnIssues);
    add(Task::GenerateQualityReport);

    let edge = |graph: &mut TaskGraph, parent: Task, child: Task| {
        // Both ends were added above
        let _ = graph.add_edge(&parent.id(), &child.id());
    };

    let first_after_ingest = if include_transform {
        Task::Dbt(DbtStep::ALL[0])
    } else {
        Task::ValidateQuality
    };
    for ingest in Task::INGEST {
        edge(&mut graph, Task::InitWarehouse, ingest);
        edge(&mut graph, ingest, first_after_ingest);
    }
    if include_transform {
        for pair in DbtStep::ALL.windows(2) {
            edge(&mut graph, Task::Dbt(pair[0]), Task::Dbt(pair[1]));
        }
        if let Some(last) = DbtStep::ALL.last() {
            edge(&mut graph, Task::Dbt(*last), Task::ValidateQuality);
        }
    }
    edge(&mut graph, Task::ValidateQuality, Task::AlertOnIssues);
    edge(&mut graph, Task::ValidateQuality, Task::GenerateQualityReport);

    graph
}
