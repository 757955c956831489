#![allow(clippy::format_push_string)]
#![allow(clippy::uninlined_format_args)]

use rust_decimal::Decimal;

use crate::calculator::CommissionResult;
use crate::drilldown::DrilldownPage;
use crate::network::NetworkNode;
use crate::search::MemberMatch;
use crate::stats::NetworkStats;

const RULE_HEAVY: &str = "═══════════════════════════════════════════════════════════════\n";
const RULE_LIGHT: &str = "───────────────────────────────────────────────────────────────\n";

pub struct CommissionReportFormatter;

impl CommissionReportFormatter {
    #[must_use]
    pub fn format(result: &CommissionResult) -> String {
        let mut output = String::new();
        let symbol = &result.currency_symbol;

        output.push('\n');
        output.push_str(RULE_HEAVY);
        output.push_str("                   COMMISSION REPORT                           \n");
        output.push_str(RULE_HEAVY);
        output.push('\n');

        // Member
        output.push_str("Member\n");
        output.push_str(RULE_LIGHT);
        match &result.user {
            Some(user) => {
                output.push_str(&format!("ID:                    {}\n", user.id));
                output.push_str(&format!("Username:              {}\n", user.username));
                output.push_str(&format!("Name:                  {}\n", user.display_name()));
            }
            None => output.push_str("Profile:               not found\n"),
        }
        output.push_str(&format!(
            "Generated:             {}\n",
            result.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push('\n');

        // Own revenue
        output.push_str("Own Revenue\n");
        output.push_str(RULE_LIGHT);
        output.push_str(&format!(
            "Lifetime:              {}{:.2}\n",
            symbol, result.total_commissions
        ));
        output.push_str(&format!(
            "This Period:           {}{:.2}\n",
            symbol, result.monthly_commissions
        ));
        output.push('\n');

        // Levels
        output.push_str("Downline by Level\n");
        output.push_str(RULE_LIGHT);
        output.push_str("Level   Rate      Members         Revenue        Earnings\n");
        for idx in 0..result.depth {
            let rate = result
                .commission_rates
                .get(idx)
                .map_or("0%", String::as_str);
            output.push_str(&format!(
                "{:<7} {:<9} {:>7} {:>15} {:>15}\n",
                idx + 1,
                rate,
                result.per_level_counts.get(idx).copied().unwrap_or(0),
                money(symbol, result.per_level_sums.get(idx).copied()),
                money(symbol, result.per_level_earnings.get(idx).copied()),
            ));
        }
        output.push('\n');

        // Summary
        output.push_str("Summary\n");
        output.push_str(RULE_LIGHT);
        output.push_str(&format!(
            "Contributing Members:  {}\n",
            result.contributing_members()
        ));
        output.push_str(&format!(
            "Total Earnings:        {}{:.2} {}\n",
            symbol,
            result.total_earnings(),
            result.currency
        ));
        output.push_str(&format!(
            "Conversion Fee:        {}%\n",
            result.conversion_rate.normalize()
        ));
        output.push('\n');
        output.push_str(RULE_HEAVY);

        output
    }

    #[must_use]
    pub fn format_drilldown(page: &DrilldownPage, level: usize, page_number: i64) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "Level {} transactions, page {} ({} total)\n",
            level, page_number, page.total
        ));
        output.push_str(RULE_LIGHT);
        if page.data.is_empty() {
            output.push_str("No transactions.\n");
            return output;
        }
        output.push_str("ID        Member               Amount  Date\n");
        for row in &page.data {
            output.push_str(&format!(
                "{:<9} {:<16} {:>10.2}  {}\n",
                row.id,
                row.username,
                row.amount,
                row.created_at.format("%Y-%m-%d %H:%M")
            ));
        }

        output
    }

    #[must_use]
    pub fn format_stats(stats: &NetworkStats, symbol: &str) -> String {
        let mut output = String::new();

        output.push_str("Network Statistics\n");
        output.push_str(RULE_LIGHT);
        output.push_str(&format!("Members:               {}\n", stats.total_users));
        output.push_str(&format!("Active:                {}\n", stats.active_users));
        output.push_str(&format!(
            "Lifetime Revenue:      {}{:.2}\n",
            symbol, stats.total_commissions
        ));
        output.push_str(&format!(
            "This Period:           {}{:.2}\n",
            symbol, stats.monthly_commissions
        ));
        output.push('\n');
        output.push_str("Tier    Members\n");
        for tier in &stats.level_distribution {
            output.push_str(&format!("{:<7} {:>7}\n", tier.level, tier.count));
        }

        output
    }

    #[must_use]
    pub fn format_matches(matches: &[MemberMatch]) -> String {
        if matches.is_empty() {
            return "No matching members.\n".to_string();
        }

        let mut output = String::new();
        output.push_str("ID        Username         Tier  Name\n");
        for member in matches {
            output.push_str(&format!(
                "{:<9} {:<16} {:>4}  {}\n",
                member.id,
                member.username,
                member.level,
                member.fullname.as_deref().unwrap_or("-")
            ));
        }

        output
    }

    #[must_use]
    pub fn format_network(root: &NetworkNode, symbol: &str) -> String {
        let mut output = String::new();
        push_node(&mut output, root, symbol, "", true, true);
        output
    }
}

fn money(symbol: &str, amount: Option<Decimal>) -> String {
    format!("{}{:.2}", symbol, amount.unwrap_or(Decimal::ZERO))
}

fn push_node(
    output: &mut String,
    node: &NetworkNode,
    symbol: &str,
    prefix: &str,
    is_last: bool,
    is_root: bool,
) {
    let branch = match (is_root, is_last) {
        (true, _) => "",
        (false, true) => "└── ",
        (false, false) => "├── ",
    };
    output.push_str(&format!(
        "{}{}{} (#{}) L{} refs={} total={}{:.2} period={}{:.2}\n",
        prefix,
        branch,
        node.fullname,
        node.id,
        node.level,
        node.direct_referrals,
        symbol,
        node.total_commissions,
        symbol,
        node.monthly_commissions
    ));

    let child_prefix = match (is_root, is_last) {
        (true, _) => prefix.to_string(),
        (false, true) => format!("{}    ", prefix),
        (false, false) => format!("{}│   ", prefix),
    };
    let count = node.children.len();
    for (idx, child) in node.children.iter().enumerate() {
        push_node(output, child, symbol, &child_prefix, idx + 1 == count, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use affiliate_core::{MemberRecord, TransactionRecord, TransactionStatus};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn result() -> CommissionResult {
        CommissionResult {
            commission_rates: vec!["10%".to_string(), "5%".to_string()],
            user: Some(MemberRecord::new(1, "root", None)),
            depth: 3,
            per_level_sums: vec![dec!(150), dec!(200), dec!(0)],
            per_level_counts: vec![2, 1, 0],
            per_level_earnings: vec![dec!(15), dec!(10), dec!(0)],
            total_commissions: dec!(80),
            monthly_commissions: dec!(20),
            generated_at: Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap(),
            currency: "PHP".to_string(),
            currency_symbol: "P".to_string(),
            conversion_rate: dec!(4.0),
        }
    }

    #[test]
    fn report_lists_every_level_and_totals() {
        let report = CommissionReportFormatter::format(&result());

        assert!(report.contains("COMMISSION REPORT"));
        assert!(report.contains("Username:              root"));
        assert!(report.contains("Lifetime:              P80.00"));
        assert!(report.contains("Total Earnings:        P25.00 PHP"));
        assert!(report.contains("Contributing Members:  3"));
        assert!(report.contains("Conversion Fee:        4%"));
        // level 3 has no configured rate
        assert!(report.contains("3       0%"));
    }

    #[test]
    fn report_marks_missing_profile() {
        let mut result = result();
        result.user = None;

        assert!(CommissionReportFormatter::format(&result).contains("not found"));
    }

    #[test]
    fn drilldown_renders_rows_or_placeholder() {
        let empty = CommissionReportFormatter::format_drilldown(&DrilldownPage::empty(), 2, 1);
        assert!(empty.contains("No transactions."));

        let page = DrilldownPage {
            data: vec![TransactionRecord {
                id: 7,
                user_id: 2,
                username: "alice".to_string(),
                amount: dec!(12.5),
                status: TransactionStatus::Completed,
                created_at: Utc.with_ymd_and_hms(2025, 3, 2, 9, 30, 0).unwrap(),
            }],
            total: 1,
        };
        let text = CommissionReportFormatter::format_drilldown(&page, 1, 1);
        assert!(text.contains("alice"));
        assert!(text.contains("12.50"));
        assert!(text.contains("2025-03-02 09:30"));
    }

    #[test]
    fn network_renders_branches() {
        let leaf = |id, name: &str| NetworkNode {
            id,
            username: name.to_string(),
            fullname: name.to_string(),
            level: 0,
            direct_referrals: 0,
            total_commissions: Decimal::ZERO,
            monthly_commissions: Decimal::ZERO,
            children: Vec::new(),
        };
        let root = NetworkNode {
            direct_referrals: 2,
            children: vec![leaf(2, "a"), leaf(3, "b")],
            ..leaf(1, "root")
        };

        let text = CommissionReportFormatter::format_network(&root, "P");

        assert!(text.starts_with("root (#1) L0 refs=2"));
        assert!(text.contains("├── a (#2)"));
        assert!(text.contains("└── b (#3)"));
    }

    #[test]
    fn stats_list_tiers() {
        let stats = NetworkStats {
            total_users: 12,
            active_users: 9,
            total_commissions: dec!(1500),
            monthly_commissions: dec!(250.5),
            source: crate::amounts::AmountSource::Orders,
            level_distribution: vec![affiliate_core::LevelCount { level: 1, count: 12 }],
        };

        let text = CommissionReportFormatter::format_stats(&stats, "P");

        assert!(text.contains("Members:               12"));
        assert!(text.contains("Lifetime Revenue:      P1500.00"));
        assert!(text.contains("This Period:           P250.50"));
        assert!(text.contains("1            12"));
    }

    #[test]
    fn matches_render_rows_or_placeholder() {
        assert_eq!(
            CommissionReportFormatter::format_matches(&[]),
            "No matching members.\n"
        );

        let text = CommissionReportFormatter::format_matches(&[MemberMatch {
            id: 4,
            username: "ana".to_string(),
            email: None,
            fullname: Some("Ana Santos".to_string()),
            level: 2,
        }]);
        assert!(text.contains("ana"));
        assert!(text.contains("Ana Santos"));
    }
}
