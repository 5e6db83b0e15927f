use crate::model::{Branch, VisitorType};

/// Local iff the reviewer location equals the branch's home country.
///
/// Comparison is exact: the dataset spells countries consistently, and an
/// unknown location counts as a tourist.
#[must_use]
pub fn classify_visitor(location: Option<&str>, branch: Branch) -> VisitorType {
    match location {
        Some(location) if location == branch.home_country() => VisitorType::Local,
        _ => VisitorType::Tourist,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("France"), Branch::Paris, VisitorType::Local)]
    #[case(Some("Germany"), Branch::Paris, VisitorType::Tourist)]
    #[case(Some("Hong Kong"), Branch::HongKong, VisitorType::Local)]
    #[case(Some("United States"), Branch::California, VisitorType::Local)]
    #[case(Some("United States"), Branch::Paris, VisitorType::Tourist)]
    #[case(Some("france"), Branch::Paris, VisitorType::Tourist)]
    #[case(None, Branch::California, VisitorType::Tourist)]
    fn classifies_by_home_country(
        #[case] location: Option<&str>,
        #[case] branch: Branch,
        #[case] expected: VisitorType,
    ) {
        assert_eq!(classify_visitor(location, branch), expected);
    }
}
