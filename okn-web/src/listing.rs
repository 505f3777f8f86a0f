//! Query parameter normalization for the vote and bill listings
//!
//! Raw query strings are accepted as-is and folded into the typed filters of
//! `okn_common::db`. Unknown or malformed values fall back to the defaults,
//! so a listing request never fails on its parameters.

use chrono::NaiveDate;
use okn_common::db::bills::{BillFilter, BillPeriod, BillType, PeriodMatch, StageFilter};
use okn_common::db::knessets::Knesset;
use okn_common::db::votes::{TimeWindow, VoteFilter, VoteOrder, VoteType};
use okn_common::stats::BillStatsStrategy;
use serde::{Deserialize, Serialize};

/// Raw `/vote/` query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoteListingQuery {
    pub vote_type: Option<String>,
    pub time: Option<String>,
    pub order: Option<String>,
    pub show_stands: Option<String>,
    pub page: Option<String>,
}

impl VoteListingQuery {
    pub fn filter(&self) -> VoteFilter {
        VoteFilter {
            vote_type: self.vote_type.as_deref().and_then(|v| VoteType::parse(v.trim())),
            time: self
                .time
                .as_deref()
                .and_then(|v| TimeWindow::parse(v.trim()))
                .unwrap_or_default(),
            order: self
                .order
                .as_deref()
                .and_then(|v| VoteOrder::parse(v.trim()))
                .unwrap_or_default(),
        }
    }

    /// Member ids whose stands are shown next to each vote
    pub fn show_stands(&self) -> Vec<String> {
        parse_show_stands(self.show_stands.as_deref())
    }
}

pub fn parse_show_stands(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// One alternate-filter link of the vote listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendPage {
    pub url: String,
    pub name: &'static str,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendPages {
    pub vote_type: Vec<FriendPage>,
    pub time: Vec<FriendPage>,
    pub order: Vec<FriendPage>,
}

fn vote_type_slug(vote_type: Option<VoteType>) -> &'static str {
    vote_type.map_or("all", VoteType::as_str)
}

fn vote_type_name(vote_type: Option<VoteType>) -> &'static str {
    match vote_type {
        None => "All votes",
        Some(VoteType::LawApprove) => "Law Approvals",
        Some(VoteType::SecondCall) => "Second Call",
        Some(VoteType::Demurrer) => "Demurrer",
        Some(VoteType::NoConfidence) => "Motion of no confidence",
        Some(VoteType::PassToCommittee) => "Pass to committee",
        Some(VoteType::Continuation) => "Continuation",
    }
}

fn time_name(time: TimeWindow) -> &'static str {
    match time {
        TimeWindow::Week => "Last Week",
        TimeWindow::Month => "Last Month",
        TimeWindow::All => "All times",
    }
}

fn order_name(order: VoteOrder) -> &'static str {
    match order {
        VoteOrder::Time => "Time",
        VoteOrder::Controversy => "Controversy",
        VoteOrder::AgainstParty => "Against Party",
        VoteOrder::Votes => "Number of votes",
    }
}

fn listing_url(filter: &VoteFilter) -> String {
    format!(
        "./?vote_type={}&time={}&order={}",
        vote_type_slug(filter.vote_type),
        filter.time.as_str(),
        filter.order.as_str()
    )
}

/// Alternate links for every option of every dimension
///
/// Each link changes one dimension and keeps the other two, so the current
/// option of a dimension links to the active listing itself.
pub fn friend_pages(active: &VoteFilter) -> FriendPages {
    let vote_types = std::iter::once(None).chain(VoteType::ALL.into_iter().map(Some));

    FriendPages {
        vote_type: vote_types
            .map(|vote_type| FriendPage {
                url: listing_url(&VoteFilter { vote_type, ..*active }),
                name: vote_type_name(vote_type),
                current: vote_type == active.vote_type,
            })
            .collect(),
        time: TimeWindow::ALL
            .into_iter()
            .map(|time| FriendPage {
                url: listing_url(&VoteFilter { time, ..*active }),
                name: time_name(time),
                current: time == active.time,
            })
            .collect(),
        order: VoteOrder::ALL
            .into_iter()
            .map(|order| FriendPage {
                url: listing_url(&VoteFilter { order, ..*active }),
                name: order_name(order),
                current: order == active.order,
            })
            .collect(),
    }
}

/// Raw `/api/bills` query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillListingQuery {
    pub stage: Option<String>,
    pub member: Option<String>,
    pub knesset_id: Option<String>,
    pub bill_type: Option<String>,
    pub pp_id: Option<String>,
    pub changed_after: Option<String>,
    pub changed_before: Option<String>,
    pub knesset_booklet: Option<String>,
    pub gov_booklet: Option<String>,
    pub page: Option<String>,
}

fn parse_id(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
}

/// A record id that was given but does not parse yields `Err`
fn parse_record_id(value: Option<&str>) -> Result<Option<i64>, ()> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse().map(Some).map_err(|_| ()),
        None => Ok(None),
    }
}

/// Outcome of normalizing the bill query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillSelection {
    Filter(BillFilter),
    /// The query names a record that cannot exist
    Empty,
}

impl BillListingQuery {
    /// Knesset number the listing is restricted to, if any
    pub fn knesset_number(&self) -> Option<i64> {
        parse_id(self.knesset_id.as_deref())
    }

    /// Build the bill filter
    ///
    /// `knesset` is the record looked up for [`Self::knesset_number`]; when a
    /// number was given but no such knesset exists the selection is empty.
    pub fn selection(
        &self,
        knesset: Option<&Knesset>,
        strategy: BillStatsStrategy,
        today: NaiveDate,
    ) -> BillSelection {
        let period = match (self.knesset_number(), knesset) {
            (Some(_), None) => return BillSelection::Empty,
            (_, Some(knesset)) => {
                let (start, end) = knesset.date_range(today);
                Some(BillPeriod {
                    start,
                    end,
                    matching: match strategy {
                        BillStatsStrategy::ProposalDate => PeriodMatch::ProposalDate,
                        BillStatsStrategy::StageDate => PeriodMatch::StageDate,
                    },
                })
            }
            (None, None) => None,
        };

        let (Ok(pp_id), Ok(knesset_booklet), Ok(gov_booklet)) = (
            parse_record_id(self.pp_id.as_deref()),
            parse_record_id(self.knesset_booklet.as_deref()),
            parse_record_id(self.gov_booklet.as_deref()),
        ) else {
            return BillSelection::Empty;
        };

        BillSelection::Filter(BillFilter {
            stage: self.stage.as_deref().and_then(StageFilter::parse),
            member: parse_id(self.member.as_deref()),
            period,
            bill_type: self
                .bill_type
                .as_deref()
                .and_then(|v| BillType::parse(v.trim()))
                .unwrap_or_default(),
            pp_id,
            changed_after: parse_date(self.changed_after.as_deref()),
            changed_before: parse_date(self.changed_before.as_deref()),
            knesset_booklet,
            gov_booklet,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use okn_common::db::bills::StageGroup;

    fn query(vote_type: &str, time: &str, order: &str) -> VoteListingQuery {
        VoteListingQuery {
            vote_type: Some(vote_type.to_string()),
            time: Some(time.to_string()),
            order: Some(order.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_parameters_equal_explicit_defaults() {
        assert_eq!(
            VoteListingQuery::default().filter(),
            query("all", "all", "time").filter()
        );
    }

    #[test]
    fn test_unknown_values_fall_back_to_defaults() {
        let filter = query("bogus", "365", "random").filter();
        assert_eq!(filter, VoteFilter::default());
    }

    #[test]
    fn test_recognized_values() {
        let filter = query("no-confidence", "7", "against-party").filter();
        assert_eq!(filter.vote_type, Some(VoteType::NoConfidence));
        assert_eq!(filter.time, TimeWindow::Week);
        assert_eq!(filter.order, VoteOrder::AgainstParty);
    }

    #[test]
    fn test_exactly_one_current_option_per_dimension() {
        let active = query("demurrer", "30", "votes").filter();
        let pages = friend_pages(&active);

        for dimension in [&pages.vote_type, &pages.time, &pages.order] {
            assert_eq!(dimension.iter().filter(|p| p.current).count(), 1);
        }
        assert_eq!(pages.vote_type.len(), 7);
        assert_eq!(pages.time.len(), 3);
        assert_eq!(pages.order.len(), 4);

        let current_type = pages.vote_type.iter().find(|p| p.current).unwrap();
        assert_eq!(current_type.name, "Demurrer");
        assert_eq!(current_type.url, "./?vote_type=demurrer&time=30&order=votes");
    }

    #[test]
    fn test_friend_page_urls_keep_other_dimensions() {
        let pages = friend_pages(&VoteFilter::default());

        assert_eq!(pages.vote_type[0].name, "All votes");
        assert!(pages.vote_type[0].current);
        assert_eq!(pages.time[0].url, "./?vote_type=all&time=7&order=time");
        assert_eq!(pages.time[0].name, "Last Week");
        assert_eq!(pages.order[1].url, "./?vote_type=all&time=all&order=controversy");
        assert_eq!(pages.order[3].name, "Number of votes");
    }

    #[test]
    fn test_show_stands() {
        assert!(parse_show_stands(None).is_empty());
        assert_eq!(parse_show_stands(Some("12, 7,,3")), vec!["12", "7", "3"]);
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bill_selection_defaults() {
        let selection = BillListingQuery::default().selection(
            None,
            BillStatsStrategy::default(),
            date(2014, 1, 1),
        );
        assert_eq!(selection, BillSelection::Filter(BillFilter::default()));
    }

    #[test]
    fn test_bill_selection_parses_filters() {
        let q = BillListingQuery {
            stage: Some("first".into()),
            member: Some("12".into()),
            knesset_id: Some("19".into()),
            bill_type: Some("private".into()),
            changed_after: Some("2013-05-01".into()),
            changed_before: Some("not a date".into()),
            ..Default::default()
        };
        let knesset = Knesset::new(19, Some(date(2013, 2, 5)), None);

        let BillSelection::Filter(filter) =
            q.selection(Some(&knesset), BillStatsStrategy::StageDate, date(2014, 1, 1))
        else {
            panic!("expected a filter");
        };
        assert_eq!(filter.stage, Some(StageFilter::Group(StageGroup::First)));
        assert_eq!(filter.member, Some(12));
        assert_eq!(filter.bill_type, BillType::Private);
        assert_eq!(filter.changed_after, Some(date(2013, 5, 1)));
        assert_eq!(filter.changed_before, None);
        let period = filter.period.unwrap();
        assert_eq!(period.start, date(2013, 2, 5));
        assert_eq!(period.end, date(2014, 1, 1));
        assert_eq!(period.matching, PeriodMatch::StageDate);
    }

    #[test]
    fn test_bill_selection_unknown_records_are_empty() {
        let q = BillListingQuery {
            knesset_id: Some("99".into()),
            ..Default::default()
        };
        assert_eq!(
            q.selection(None, BillStatsStrategy::default(), date(2014, 1, 1)),
            BillSelection::Empty
        );

        let q = BillListingQuery {
            pp_id: Some("abc".into()),
            ..Default::default()
        };
        assert_eq!(
            q.selection(None, BillStatsStrategy::default(), date(2014, 1, 1)),
            BillSelection::Empty
        );
    }

    #[test]
    fn test_bill_selection_booklets() {
        let q = BillListingQuery {
            knesset_booklet: Some(" 512 ".into()),
            gov_booklet: Some(String::new()),
            ..Default::default()
        };
        let BillSelection::Filter(filter) =
            q.selection(None, BillStatsStrategy::default(), date(2014, 1, 1))
        else {
            panic!("expected a filter");
        };
        assert_eq!(filter.knesset_booklet, Some(512));
        assert_eq!(filter.gov_booklet, None);

        let q = BillListingQuery {
            gov_booklet: Some("first".into()),
            ..Default::default()
        };
        assert_eq!(
            q.selection(None, BillStatsStrategy::default(), date(2014, 1, 1)),
            BillSelection::Empty
        );
    }
}
