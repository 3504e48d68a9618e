//! # Master Projects
//!
//! Groups sale records sharing a project name into one aggregate row.
//! Computed on demand; [`refresh_master_projects`] writes the result into
//! the persisted cache while keeping user-entered description and location.

use std::collections::{HashMap, HashSet};

use crate::dataset::CrmData;
use crate::types::{MasterProject, Project};

fn group_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Stable ID derived from the project name.
fn master_id(name: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("mp_{}", slug.trim_matches('-'))
}

/// Aggregates projects by name, in order of first appearance.
///
/// Projects without a name are left out.
pub fn aggregate_master_projects(projects: &[Project]) -> Vec<MasterProject> {
    let mut order: Vec<MasterProject> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut customers: Vec<HashSet<&str>> = Vec::new();

    for project in projects {
        let Some(name) = project.name.as_deref().filter(|n| !n.trim().is_empty()) else {
            continue;
        };
        let slot = *index.entry(group_key(name)).or_insert_with(|| {
            order.push(MasterProject {
                id: master_id(name),
                name: name.trim().to_string(),
                ..Default::default()
            });
            customers.push(HashSet::new());
            order.len() - 1
        });

        let master = &mut order[slot];
        master.project_ids.push(project.id.clone());
        master.total_units += 1;
        master.total_sale += project.sale;
        master.total_received += project.received;
        master.total_balance += project.outstanding();
        if !project.customer_id.is_empty() {
            customers[slot].insert(project.customer_id.as_str());
        }
    }

    for (master, seen) in order.iter_mut().zip(&customers) {
        master.total_customers = seen.len() as u32;
    }
    order
}

/// Rebuilds the cached master-project list in place.
pub fn refresh_master_projects(data: &mut CrmData) {
    let previous: HashMap<String, MasterProject> = data
        .master_projects
        .drain(..)
        .map(|m| (group_key(&m.name), m))
        .collect();

    data.master_projects = aggregate_master_projects(&data.projects)
        .into_iter()
        .map(|mut fresh| {
            if let Some(old) = previous.get(&group_key(&fresh.name)) {
                fresh.id = old.id.clone();
                fresh.description = old.description.clone();
                fresh.location = old.location.clone();
                fresh.created_at = old.created_at.clone();
            }
            fresh
        })
        .collect();
}
