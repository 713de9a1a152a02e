use std::sync::LazyLock;

use regex::Regex;

use crate::db::RecordRow;

/// Liberal UK number: `(01202) 525072`, `0207 123 4567`, `0121-456-7890`.
/// Area code then 6–10 subscriber digits, tolerating spaces and hyphens.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\(\s*0\d{1,4}\s*\)|0\d{2,4})[\s\-]*\d[\d\s\-]{5,9}").unwrap()
});

/// Map an entry blob to name / address / phone.
///
/// Everything before the first phone match is split on its first comma into
/// name and address. `raw_text` always carries the whole trimmed blob.
pub fn explode(blob: &str) -> RecordRow {
    let raw_text = blob.trim();

    let (prefix, phone) = match PHONE_RE.find(raw_text) {
        Some(m) => (&raw_text[..m.start()], Some(m.as_str())),
        None => (raw_text, None),
    };

    let (name, address) = match prefix.split_once(',') {
        Some((name, address)) => (Some(name), Some(address)),
        None => (Some(prefix), None),
    };

    RecordRow {
        name: clean(name),
        address: clean(address),
        phone: clean(phone),
        page: None,
        raw_text: raw_text.to_string(),
    }
}

fn clean(field: Option<&str>) -> Option<String> {
    field
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_address_phone() {
        let r = explode("Jane Doe, 1 High St, Poole (01202) 525072");
        assert_eq!(r.name.as_deref(), Some("Jane Doe"));
        assert_eq!(r.address.as_deref(), Some("1 High St, Poole"));
        assert_eq!(r.phone.as_deref(), Some("(01202) 525072"));
        assert_eq!(r.raw_text, "Jane Doe, 1 High St, Poole (01202) 525072");
    }

    #[test]
    fn no_comma_means_no_address() {
        let r = explode("Acme Ltd (0121) 4567890");
        assert_eq!(r.name.as_deref(), Some("Acme Ltd"));
        assert_eq!(r.address, None);
        assert_eq!(r.phone.as_deref(), Some("(0121) 4567890"));
    }

    #[test]
    fn bare_area_code_with_separators() {
        let r = explode("Roe J, 2 Low St 0207-123-4567");
        assert_eq!(r.phone.as_deref(), Some("0207-123-4567"));
        assert_eq!(r.address.as_deref(), Some("2 Low St"));
    }

    #[test]
    fn no_phone_keeps_whole_prefix() {
        let r = explode("  Orphan Entry, 9 End Rd  ");
        assert_eq!(r.phone, None);
        assert_eq!(r.name.as_deref(), Some("Orphan Entry"));
        assert_eq!(r.address.as_deref(), Some("9 End Rd"));
        assert_eq!(r.raw_text, "Orphan Entry, 9 End Rd");
    }

    #[test]
    fn surname_first_names_split_on_first_comma() {
        let r = explode("Smith, J., 4 Green La (01305) 262626");
        assert_eq!(r.name.as_deref(), Some("Smith"));
        assert_eq!(r.address.as_deref(), Some("J., 4 Green La"));
    }

    #[test]
    fn empty_parts_become_absent() {
        let r = explode("(01202) 525072");
        assert_eq!(r.name, None);
        assert_eq!(r.address, None);
        assert_eq!(r.phone.as_deref(), Some("(01202) 525072"));

        let r = explode("Jane Doe, (01202) 525072");
        assert_eq!(r.name.as_deref(), Some("Jane Doe"));
        assert_eq!(r.address, None);
    }
}
