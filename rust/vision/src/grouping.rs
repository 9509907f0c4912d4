// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Grouping of legend instances by color and fill pattern

use rustc_hash::FxHashMap;

use crate::types::{LegendGroup, LegendInstance};

/// Key shared by all instances of one group
pub fn group_key(instance: &LegendInstance) -> String {
    format!("{}_{}", instance.color, instance.pattern)
}

/// Cluster instances into groups, in first-seen order of each key
///
/// The first member of a group supplies its sample preview.
pub fn group_legends(instances: &[LegendInstance]) -> Vec<LegendGroup> {
    let mut groups: Vec<LegendGroup> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();

    for instance in instances {
        let key = group_key(instance);
        match index.get(&key) {
            Some(&slot) => {
                let group = &mut groups[slot];
                group.count += 1;
                group.instances.push(instance.clone());
            }
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(LegendGroup {
                    group_key: key,
                    color: instance.color,
                    pattern: instance.pattern,
                    sample_preview: instance.preview.clone(),
                    sample_instance_id: instance.id,
                    count: 1,
                    instances: vec![instance.clone()],
                });
            }
        }
    }

    tracing::debug!(
        instances = instances.len(),
        groups = groups.len(),
        "grouped legend instances"
    );
    groups
}
