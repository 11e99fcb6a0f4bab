//! Report metadata parsed from `show report.<name>` output.

/// Description of one report: columns, sort order, filter query and the
/// priority values configured for the account.
#[derive(Debug, Clone, Default)]
pub struct ReportInfo {
    /// Human-readable report description.
    pub description: String,
    /// Filter query the report applies.
    pub query: String,
    /// Column name to display format, in configured order.
    pub fields: Vec<(String, String)>,
    /// Sort keys; `true` means ascending.
    pub sort: Vec<(String, bool)>,
    /// Configured priority values (`uda.priority.values`).
    pub priorities: Vec<String>,
}

impl ReportInfo {
    /// Fold one `report.<name>.*` key/value pair into the info.
    pub fn absorb(&mut self, key: &str, value: &str) {
        if key.ends_with(".columns") {
            for part in value.split(',').filter(|p| !p.is_empty()) {
                match part.split_once('.') {
                    Some((name, format)) => {
                        self.fields.push((name.to_string(), format.to_string()));
                    }
                    None => self.fields.push((part.to_string(), String::new())),
                }
            }
        } else if key.ends_with(".sort") {
            for part in value.split(',').filter(|p| !p.is_empty()) {
                let part = part.strip_suffix('/').unwrap_or(part);
                // Trailing '+' or '-' marks the direction.
                let Some(direction) = part.chars().last() else {
                    continue;
                };
                let column = &part[..part.len() - direction.len_utf8()];
                self.sort.push((column.to_string(), direction == '+'));
            }
        } else if key.ends_with(".filter") {
            self.query = value.to_string();
        } else if key.ends_with(".description") {
            self.description = value.to_string();
        }
    }
}

/// Split a `uda.priority.values` setting into individual priorities,
/// dropping empty entries (a trailing comma marks "no priority allowed").
pub fn parse_priorities(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorbs_columns() {
        let mut info = ReportInfo::default();
        info.absorb("report.next.columns", "id,description.count,urgency");
        assert_eq!(
            info.fields,
            vec![
                ("id".to_string(), String::new()),
                ("description".to_string(), "count".to_string()),
                ("urgency".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn absorbs_sort_directions() {
        let mut info = ReportInfo::default();
        info.absorb("report.next.sort", "urgency-/,due+");
        assert_eq!(
            info.sort,
            vec![("urgency".to_string(), false), ("due".to_string(), true)]
        );
    }

    #[test]
    fn absorbs_filter_and_description() {
        let mut info = ReportInfo::default();
        info.absorb("report.next.filter", "status:pending");
        info.absorb("report.next.description", "Most urgent tasks");
        assert_eq!(info.query, "status:pending");
        assert_eq!(info.description, "Most urgent tasks");
    }

    #[test]
    fn unrelated_keys_are_ignored() {
        let mut info = ReportInfo::default();
        info.absorb("report.next.context", "1");
        assert!(info.fields.is_empty());
        assert!(info.sort.is_empty());
    }

    #[test]
    fn priorities_drop_empty_entries() {
        assert_eq!(parse_priorities("H,M,L,"), vec!["H", "M", "L"]);
        assert!(parse_priorities("").is_empty());
    }
}
