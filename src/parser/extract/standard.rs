use super::{ExtractError, Record};
use crate::parser::Document;

/// Identity of the standard itself. Exactly one per document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandardRow {
    pub job_id: String,
    pub ref_dated: Option<String>,
    pub ref_undated: Option<String>,
    pub doc_ref: Option<String>,
    pub rel_date: Option<String>,
    pub secretariat: Option<String>,
    // doc-ident
    pub sdo: Option<String>,
    pub proj_id: Option<String>,
    pub doc_lang: Option<String>,
    pub rel_version: Option<String>,
    pub urn: Option<String>,
    // std-ident
    pub originator: Option<String>,
    pub doc_type: Option<String>,
    pub doc_nr: Option<String>,
    pub part_nr: Option<String>,
    pub edition: Option<String>,
    pub version: Option<String>,
    pub year: Option<String>,
    pub pub_date: Option<String>,
    pub content_language: Option<String>,
}

impl Record for StandardRow {
    const FIELDS: &'static [&'static str] = &[
        "id",
        "ref_dated",
        "ref_undated",
        "doc_ref",
        "rel_date",
        "secretariat",
        "sdo",
        "proj_id",
        "doc_lang",
        "rel_version",
        "urn",
        "originator",
        "doc_type",
        "doc_nr",
        "part_nr",
        "edition",
        "version",
        "year",
        "pub_date",
        "content_language",
    ];

    fn into_values(self) -> Vec<Option<String>> {
        vec![
            Some(self.job_id),
            self.ref_dated,
            self.ref_undated,
            self.doc_ref,
            self.rel_date,
            self.secretariat,
            self.sdo,
            self.proj_id,
            self.doc_lang,
            self.rel_version,
            self.urn,
            self.originator,
            self.doc_type,
            self.doc_nr,
            self.part_nr,
            self.edition,
            self.version,
            self.year,
            self.pub_date,
            self.content_language,
        ]
    }
}

pub fn extract(doc: &Document) -> Result<StandardRow, ExtractError> {
    let tree = &doc.tree;
    let root = tree.root();
    let std_ref = |kind| {
        tree.find_by_attr(root, "std-ref", "type", kind)
            .map(|n| tree.text(n).to_uppercase())
    };

    let sib = tree
        .find(root, "std-ident")
        .ok_or(ExtractError::MissingRequiredStructure {
            extractor: "standard",
            element: "std-ident",
        })?;

    let mut row = StandardRow {
        job_id: doc.job_id.clone(),
        ref_dated: std_ref("dated"),
        ref_undated: std_ref("undated"),
        doc_ref: tree.find_text(root, "doc-ref"),
        rel_date: tree.find_text(root, "release-date"),
        secretariat: tree.find_text(root, "secretariat"),
        originator: tree.find_text(sib, "originator"),
        doc_type: tree.find_text(sib, "doc-type"),
        doc_nr: tree.find_text(sib, "doc-number"),
        part_nr: tree.find_text(sib, "part-number"),
        edition: tree.find_text(sib, "edition"),
        version: tree.find_text(sib, "version"),
        year: tree.find_text(sib, "year"),
        pub_date: tree.find_text(root, "pub-date"),
        content_language: tree.find_text(root, "content-language"),
        ..StandardRow::default()
    };

    if let Some(dib) = tree.find(root, "doc-ident") {
        row.sdo = tree.find_text(dib, "sdo");
        row.proj_id = tree.find_text(dib, "proj-id");
        row.doc_lang = tree.find_text(dib, "language");
        row.rel_version = tree.find_text(dib, "release-version");
        row.urn = tree.find_text(dib, "urn");
    }

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    const META: &str = r#"<standard><front><iso-meta>
        <title-wrap xml:lang="en"><main>Quality</main></title-wrap>
        <doc-ident>
            <sdo>ISO</sdo><proj-id>62085</proj-id><language>en</language>
            <release-version>IS</release-version><urn>iso:std:iso:9001:ed-5:en</urn>
        </doc-ident>
        <std-ident>
            <originator>ISO</originator><doc-type>IS</doc-type><doc-number>9001</doc-number>
            <edition>5</edition><version>2015</version>
        </std-ident>
        <content-language>en</content-language>
        <std-ref type="dated">iso 9001:2015(e)</std-ref>
        <std-ref type="undated">iso 9001</std-ref>
        <doc-ref>ISO 9001:2015(en)</doc-ref>
        <pub-date>2015-09-15</pub-date>
        <release-date>2015-09-14</release-date>
        <secretariat>BSI</secretariat>
    </iso-meta></front></standard>"#;

    #[test]
    fn std_refs_decode_entities_before_upper_casing() {
        let xml = r#"<iso-meta><std-ident/>
            <std-ref type="dated">iso&nbsp;9001:2015/amd&#160;1 &amp; cor 1</std-ref>
        </iso-meta>"#;
        let row = extract(&Document::parse("9001", xml).unwrap()).unwrap();
        assert_eq!(row.ref_dated.as_deref(), Some("ISO\u{a0}9001:2015/AMD\u{a0}1 & COR 1"));
        assert_eq!(row.ref_undated, None);
    }

    #[test]
    fn full_metadata() {
        let row = extract(&Document::parse("9001", META).unwrap()).unwrap();
        assert_eq!(row.job_id, "9001");
        assert_eq!(row.ref_dated.as_deref(), Some("ISO 9001:2015(E)"));
        assert_eq!(row.ref_undated.as_deref(), Some("ISO 9001"));
        assert_eq!(row.doc_ref.as_deref(), Some("ISO 9001:2015(en)"));
        assert_eq!(row.pub_date.as_deref(), Some("2015-09-15"));
        assert_eq!(row.rel_date.as_deref(), Some("2015-09-14"));
        assert_eq!(row.secretariat.as_deref(), Some("BSI"));
        assert_eq!(row.content_language.as_deref(), Some("en"));
        assert_eq!(row.sdo.as_deref(), Some("ISO"));
        assert_eq!(row.proj_id.as_deref(), Some("62085"));
        assert_eq!(row.doc_lang.as_deref(), Some("en"));
        assert_eq!(row.rel_version.as_deref(), Some("IS"));
        assert_eq!(row.urn.as_deref(), Some("iso:std:iso:9001:ed-5:en"));
        assert_eq!(row.originator.as_deref(), Some("ISO"));
        assert_eq!(row.doc_type.as_deref(), Some("IS"));
        assert_eq!(row.doc_nr.as_deref(), Some("9001"));
        assert_eq!(row.part_nr, None);
        assert_eq!(row.edition.as_deref(), Some("5"));
        assert_eq!(row.version.as_deref(), Some("2015"));
        assert_eq!(row.year, None);
    }

    #[test]
    fn missing_doc_ident_leaves_its_fields_absent() {
        let xml = r#"<nat-meta><std-ident><originator>NEN</originator><doc-number>1010</doc-number>
            <year>2020</year></std-ident></nat-meta>"#;
        let row = extract(&Document::parse("1010", xml).unwrap()).unwrap();
        assert_eq!(row.sdo, None);
        assert_eq!(row.proj_id, None);
        assert_eq!(row.doc_lang, None);
        assert_eq!(row.rel_version, None);
        assert_eq!(row.urn, None);
        assert_eq!(row.originator.as_deref(), Some("NEN"));
        assert_eq!(row.doc_nr.as_deref(), Some("1010"));
        assert_eq!(row.year.as_deref(), Some("2020"));
    }

    #[test]
    fn missing_std_ident_fails() {
        let xml = "<iso-meta><doc-ident><sdo>ISO</sdo></doc-ident></iso-meta>";
        let err = extract(&Document::parse("x", xml).unwrap()).unwrap_err();
        assert_eq!(
            err,
            ExtractError::MissingRequiredStructure {
                extractor: "standard",
                element: "std-ident"
            }
        );
    }
}
