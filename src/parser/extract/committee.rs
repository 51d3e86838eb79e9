use tracing::debug;

use super::{metadata_container, Record};
use crate::parser::tree::{NodeId, Tree};
use crate::parser::Document;

const GROUP: &str = "comm-ref-group";
const LEAF: &str = "comm-ref";

/// Committee responsible for the standard. `level` is the depth of the
/// enclosing `comm-ref-group` (1 = outermost), absent for ungrouped refs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitteeRow {
    pub job_id: String,
    pub level: Option<u32>,
    pub committee: String,
}

impl Record for CommitteeRow {
    const FIELDS: &'static [&'static str] = &["id", "level", "committee"];

    fn into_values(self) -> Vec<Option<String>> {
        vec![
            Some(self.job_id),
            self.level.map(|l| l.to_string()),
            Some(self.committee),
        ]
    }
}

pub fn extract(doc: &Document) -> Vec<CommitteeRow> {
    let tree = &doc.tree;
    let Some(meta) = metadata_container(tree) else {
        return Vec::new();
    };

    let row = |level: Option<u32>, committee: String| CommitteeRow {
        job_id: doc.job_id.clone(),
        level,
        committee,
    };

    let chain = group_chain(tree, meta);
    if chain.is_empty() {
        return tree
            .children_named(meta, LEAF)
            .into_iter()
            .map(|c| row(None, tree.text(c)))
            .collect();
    }

    debug!(job_id = %doc.job_id, depth = chain.len(), "committee groups");
    let groups: Vec<Vec<String>> = chain
        .iter()
        .map(|&g| {
            tree.children_named(g, LEAF)
                .into_iter()
                .map(|c| tree.text(c))
                .collect::<Vec<_>>()
        })
        .collect();

    assign_levels(groups)
        .into_iter()
        .map(|(level, committee)| row(Some(level), committee))
        .collect()
}

/// Grouping nodes from outermost to innermost; each is the first group found
/// below the previous one.
fn group_chain(tree: &Tree, container: NodeId) -> Vec<NodeId> {
    let mut chain = Vec::new();
    let mut scope = container;
    while let Some(group) = tree.find(scope, GROUP) {
        chain.push(group);
        scope = group;
    }
    chain
}

/// `groups[0]` holds the leaves of the outermost group. Output runs from the
/// innermost level outwards, leaves keeping document order within a level.
pub fn assign_levels(groups: Vec<Vec<String>>) -> Vec<(u32, String)> {
    groups
        .into_iter()
        .enumerate()
        .rev()
        .flat_map(|(depth, leaves)| {
            let level = depth as u32 + 1;
            leaves.into_iter().map(move |c| (level, c))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committees(xml: &str) -> Vec<(Option<u32>, String)> {
        let doc = Document::parse("job", xml).unwrap();
        extract(&doc)
            .into_iter()
            .map(|r| (r.level, r.committee))
            .collect()
    }

    #[test]
    fn levels_innermost_first() {
        let groups = vec![
            vec!["TC 1".to_string()],
            vec!["SC 2".to_string(), "SC 3".to_string()],
            vec![],
            vec!["WG 4".to_string()],
        ];
        assert_eq!(
            assign_levels(groups),
            vec![
                (4, "WG 4".to_string()),
                (2, "SC 2".to_string()),
                (2, "SC 3".to_string()),
                (1, "TC 1".to_string()),
            ]
        );
    }

    #[test]
    fn three_nested_groups_yield_3_2_1() {
        let xml = r#"<std-meta>
            <comm-ref-group>
                <comm-ref>ISO/TC 22</comm-ref>
                <comm-ref-group>
                    <comm-ref>ISO/TC 22/SC 32</comm-ref>
                    <comm-ref-group>
                        <comm-ref>ISO/TC 22/SC 32/WG 8</comm-ref>
                    </comm-ref-group>
                </comm-ref-group>
            </comm-ref-group>
        </std-meta>"#;
        assert_eq!(
            committees(xml),
            vec![
                (Some(3), "ISO/TC 22/SC 32/WG 8".to_string()),
                (Some(2), "ISO/TC 22/SC 32".to_string()),
                (Some(1), "ISO/TC 22".to_string()),
            ]
        );
    }

    #[test]
    fn ungrouped_refs_have_no_level() {
        let xml = "<iso-meta><comm-ref>ISO/TC 176</comm-ref><comm-ref>ISO/TC 176/SC 2</comm-ref></iso-meta>";
        assert_eq!(
            committees(xml),
            vec![(None, "ISO/TC 176".to_string()), (None, "ISO/TC 176/SC 2".to_string())]
        );
    }

    #[test]
    fn ungrouped_refs_must_be_direct_children() {
        let xml = "<iso-meta><comm-ref>A</comm-ref><other><comm-ref>B</comm-ref></other></iso-meta>";
        assert_eq!(committees(xml), vec![(None, "A".to_string())]);
    }

    #[test]
    fn group_leaves_are_direct_children_only() {
        let xml = "<std-meta><comm-ref-group><comm-ref>A</comm-ref><x><comm-ref>hidden</comm-ref></x></comm-ref-group></std-meta>";
        assert_eq!(committees(xml), vec![(Some(1), "A".to_string())]);
    }

    #[test]
    fn container_resolved_independently() {
        let xml = "<std><nat-meta><comm-ref>NEN</comm-ref></nat-meta><iso-meta><comm-ref>ISO</comm-ref></iso-meta></std>";
        assert_eq!(committees(xml), vec![(None, "ISO".to_string())]);
        assert!(committees("<std><comm-ref>loose</comm-ref></std>").is_empty());
    }
}
