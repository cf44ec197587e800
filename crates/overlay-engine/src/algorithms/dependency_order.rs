//! Topic Dependency Resolution Order
//!
//! Depth-first, left-to-right over each topic's declared dependencies,
//! emitting a topic only after all of its dependencies. Topics already
//! decided in the current submission are skipped.
//!
//! Uses an explicit stack. A topic that reappears while still on the stack
//! is a cycle and fails fast instead of recursing forever.

use crate::domain::errors::DependencyError;
use std::collections::HashSet;

struct Frame {
    topic: String,
    dependencies: Vec<String>,
    next: usize,
}

/// Compute the order in which topics must be decided so that `root` can be.
///
/// `dependencies_of` returns `None` for unregistered topics. The result
/// ends with `root` unless `root` is already resolved, in which case it is
/// empty.
pub fn resolution_order<R, D>(
    root: &str,
    is_resolved: R,
    dependencies_of: D,
    max_depth: usize,
) -> Result<Vec<String>, DependencyError>
where
    R: Fn(&str) -> bool,
    D: Fn(&str) -> Option<Vec<String>>,
{
    if is_resolved(root) {
        return Ok(Vec::new());
    }

    let root_dependencies = dependencies_of(root).ok_or_else(|| DependencyError::UnknownTopic {
        topic: root.to_string(),
        required_by: None,
    })?;

    let mut stack = vec![Frame {
        topic: root.to_string(),
        dependencies: root_dependencies,
        next: 0,
    }];
    let mut emitted: HashSet<String> = HashSet::new();
    let mut order = Vec::new();

    while let Some(frame) = stack.last_mut() {
        if frame.next >= frame.dependencies.len() {
            let Some(done) = stack.pop() else { break };
            emitted.insert(done.topic.clone());
            order.push(done.topic);
            continue;
        }

        let dependency = frame.dependencies[frame.next].clone();
        frame.next += 1;
        let required_by = frame.topic.clone();

        if is_resolved(&dependency) || emitted.contains(&dependency) {
            continue;
        }

        if let Some(position) = stack.iter().position(|f| f.topic == dependency) {
            let mut cycle: Vec<String> = stack[position..].iter().map(|f| f.topic.clone()).collect();
            cycle.push(dependency);
            return Err(DependencyError::Cycle(cycle));
        }

        if stack.len() >= max_depth {
            return Err(DependencyError::TooDeep {
                topic: dependency,
                max_depth,
            });
        }

        let dependencies =
            dependencies_of(&dependency).ok_or_else(|| DependencyError::UnknownTopic {
                topic: dependency.clone(),
                required_by: Some(required_by),
            })?;

        stack.push(Frame {
            topic: dependency,
            dependencies,
            next: 0,
        });
    }

    Ok(order)
}
