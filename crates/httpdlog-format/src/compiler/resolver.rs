//! Field resolution: timestamp grouping, request-line decomposition,
//! duplicate arbitration, and column-name collision resolution.

use std::collections::{HashMap, HashSet};

use crate::compiler::{FormatField, TimestampGroup};

/// Resolve a freshly tokenized field list in place and return the timestamp
/// groups. Runs the passes in a fixed order so schemas are deterministic:
/// grouping, request decomposition, duration/bytes/pid/port arbitration, then
/// general collision resolution.
pub(crate) fn resolve(fields: &mut [FormatField]) -> Vec<TimestampGroup> {
    let groups = group_timestamps(fields);
    name_timestamp_groups(fields, &groups);
    decompose_request_line(fields);
    arbitrate_durations(fields);
    arbitrate_bytes(fields);
    arbitrate_bare_wins(fields, "%P", "pid", "process_id");
    arbitrate_bare_wins(fields, "%p", "canonical", "server_port");
    resolve_collisions(fields);
    groups
}

/// Collect contiguous runs of `%t` fields with matching polarity. A non-`%t`
/// field or a polarity switch closes the current group. Only the first field
/// of each group emits a column.
fn group_timestamps(fields: &mut [FormatField]) -> Vec<TimestampGroup> {
    let mut groups: Vec<TimestampGroup> = Vec::new();
    let mut current: Option<usize> = None;

    for idx in 0..fields.len() {
        let Some(spec) = fields[idx].timestamp.as_ref() else {
            current = None;
            continue;
        };
        let is_end = spec.is_end;

        let group_idx = match current {
            Some(g) if groups[g].is_end == is_end => g,
            _ => {
                groups.push(TimestampGroup {
                    fields: Vec::new(),
                    is_end,
                });
                groups.len() - 1
            }
        };
        current = Some(group_idx);

        if !groups[group_idx].fields.is_empty() {
            fields[idx].should_skip = true;
        }
        groups[group_idx].fields.push(idx);
        if let Some(spec) = fields[idx].timestamp.as_mut() {
            spec.group = group_idx;
        }
    }

    groups
}

/// When both begin- and end-polarity groups exist, the end group owns the
/// canonical `timestamp` column and the begin group is renamed.
fn name_timestamp_groups(fields: &mut [FormatField], groups: &[TimestampGroup]) {
    let has_end = groups.iter().any(|g| g.is_end);
    let has_begin = groups.iter().any(|g| !g.is_end);
    if !(has_end && has_begin) {
        return;
    }

    for group in groups {
        let Some(&leader) = group.fields.first() else {
            continue;
        };
        fields[leader].column_name = if group.is_end {
            "timestamp".to_owned()
        } else {
            "timestamp_original".to_owned()
        };
    }
}

/// Individual directives always beat the `%r` decomposition: when `%m`, a
/// `%U` variant, `%q`, or `%H` appears alongside a request-line field, the
/// corresponding sub-column of the request field is suppressed.
fn decompose_request_line(fields: &mut [FormatField]) {
    if !fields.iter().any(FormatField::is_request) {
        return;
    }

    let has_method = fields.iter().any(|f| f.directive == "%m");
    let has_path = fields
        .iter()
        .any(|f| matches!(f.directive.as_str(), "%U" | "%>U" | "%<U"));
    let has_query = fields.iter().any(|f| f.directive == "%q");
    let has_protocol = fields.iter().any(|f| f.directive == "%H");

    for field in fields.iter_mut().filter(|f| f.is_request()) {
        field.skip_method = has_method;
        field.skip_path = has_path;
        field.skip_query_string = has_query;
        field.skip_protocol = has_protocol;
    }
}

/// Precision rank of a duration directive: `%D` variants (microseconds) beat
/// `%{us}T`, then `%{ms}T`, bare `%T` (seconds), and `%{s}T`.
fn duration_precision(field: &FormatField) -> i32 {
    if field.directive.ends_with('D') {
        return 4;
    }
    match field.modifier.as_deref() {
        Some("us") => 3,
        Some("ms") => 2,
        Some("s") => 0,
        _ => 1,
    }
}

/// Keep only the highest-precision duration when several duration directives
/// resolve to the same column name; equal-precision duplicates are left for
/// collision numbering.
fn arbitrate_durations(fields: &mut [FormatField]) {
    let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, field) in fields.iter().enumerate() {
        if field.should_skip || !matches!(field.directive.as_str(), "%D" | "%>D" | "%<D" | "%T" | "%>T" | "%<T")
        {
            continue;
        }
        by_name.entry(field.column_name.clone()).or_default().push(idx);
    }

    for indices in by_name.values() {
        if indices.len() < 2 {
            continue;
        }
        let best = indices
            .iter()
            .map(|&i| duration_precision(&fields[i]))
            .max()
            .unwrap_or(0);
        for &idx in indices {
            if duration_precision(&fields[idx]) < best {
                fields[idx].should_skip = true;
            }
        }
    }
}

/// `%b` and `%B` share the `bytes` column; the first occurrence wins and the
/// rest are skipped.
fn arbitrate_bytes(fields: &mut [FormatField]) {
    let mut seen = false;
    for field in fields.iter_mut() {
        if !matches!(field.directive.as_str(), "%b" | "%B") {
            continue;
        }
        if seen {
            field.should_skip = true;
        }
        seen = true;
    }
}

/// A bare directive beats its explicit-modifier spelling when both resolve to
/// the same column (`%P` vs `%{pid}P`, `%p` vs `%{canonical}p`).
fn arbitrate_bare_wins(fields: &mut [FormatField], tag: &str, modifier: &str, column: &str) {
    let bare_present = fields.iter().any(|f| {
        f.directive == tag && f.modifier.is_none() && f.column_name == column && !f.should_skip
    });
    if !bare_present {
        return;
    }

    for field in fields.iter_mut() {
        if field.directive == tag
            && field.modifier.as_deref() == Some(modifier)
            && field.column_name == column
        {
            field.should_skip = true;
        }
    }
}

/// General collision resolution over the emitting fields.
///
/// Groups fields by resolved column name. Identical directive+modifier
/// duplicates are numbered `_2`, `_3`, ...; otherwise the lowest collision
/// priority keeps the base name and each successor appends its registry
/// suffix. A final pass numbers any names that still collide.
fn resolve_collisions(fields: &mut [FormatField]) {
    let emitting: Vec<usize> = (0..fields.len()).filter(|&i| !fields[i].should_skip).collect();

    // Group by name, preserving first-seen order.
    let mut names: Vec<String> = Vec::new();
    let mut members: Vec<Vec<usize>> = Vec::new();
    for &idx in &emitting {
        let name = &fields[idx].column_name;
        match names.iter().position(|n| n == name) {
            Some(pos) => members[pos].push(idx),
            None => {
                names.push(name.clone());
                members.push(vec![idx]);
            }
        }
    }

    for (name, indices) in names.iter().zip(&members) {
        if indices.len() < 2 {
            continue;
        }

        let all_same = indices.iter().all(|&i| {
            fields[i].directive == fields[indices[0]].directive
                && fields[i].modifier == fields[indices[0]].modifier
        });

        if all_same {
            for (occurrence, &idx) in indices.iter().enumerate().skip(1) {
                fields[idx].column_name = format!("{name}_{}", occurrence + 1);
            }
            continue;
        }

        let mut order = indices.clone();
        order.sort_by_key(|&i| fields[i].priority);
        for &idx in order.iter().skip(1) {
            fields[idx].column_name = format!("{name}{}", fields[idx].suffix);
        }
    }

    // Suffixed names can themselves collide (e.g. two %{X}i); number them.
    let mut used: HashSet<String> = HashSet::new();
    for &idx in &emitting {
        if used.insert(fields[idx].column_name.clone()) {
            continue;
        }
        let base = fields[idx].column_name.clone();
        let mut counter = 2;
        loop {
            let candidate = format!("{base}_{counter}");
            if used.insert(candidate.clone()) {
                fields[idx].column_name = candidate;
                break;
            }
            counter += 1;
        }
    }
}
