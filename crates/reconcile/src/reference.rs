use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_invoice_label,
    r"(?i)\b(?:fattura|invoice|inv|ft)[\s.:#°\-]*([0-9]+(?:/[0-9]+)?)");
re!(re_number_label,
    r"(?i)\b(?:num|nr|n)\.?[\s:#°\-]*([0-9]+(?:/[0-9]+)?)");
re!(re_long_number,
    r"\b[0-9]{4,}\b");

/// Pull candidate invoice/document numbers out of free text.
///
/// Three pattern families are scanned, all of them, in order: numbers after
/// an invoice word (`fattura`, `ft`, `inv`, `invoice`), numbers after a
/// number abbreviation (`n.`, `n`, `num`, `nr`), and any standalone run of
/// four or more digits. Every hit is reduced to its digits, so `123/45`
/// becomes `12345`.
pub fn extract_references(text: &str) -> BTreeSet<String> {
    let mut refs = BTreeSet::new();

    for re in [re_invoice_label(), re_number_label()] {
        for caps in re.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                insert_digits(&mut refs, m.as_str());
            }
        }
    }
    for m in re_long_number().find_iter(text) {
        insert_digits(&mut refs, m.as_str());
    }

    refs
}

fn insert_digits(refs: &mut BTreeSet<String>, raw: &str) {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        refs.insert(digits);
    }
}

/// True if any reference on one side is a substring of any on the other.
pub fn references_overlap(left: &BTreeSet<String>, right: &BTreeSet<String>) -> bool {
    left.iter()
        .any(|l| right.iter().any(|r| l.contains(r.as_str()) || r.contains(l.as_str())))
}
