use std::sync::LazyLock;

use chrono::NaiveDate;
use log::warn;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// One forum entry kept for the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub title: String,
    /// Always absolute, even when the markup used a relative href.
    pub link: String,
}

/// The ordered output of one extraction pass. Empty is a valid terminal
/// state, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestResult {
    pub date: NaiveDate,
    pub posts: Vec<Post>,
}

static TIME_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}$").unwrap());

/// The board substitutes the time of day for the date column on the day of
/// posting, so a bare `HH:MM` cell is the whole "posted today" signal. The
/// clock value itself is never compared against wall-clock time. If the site
/// ever changes this convention, this predicate is the only place to touch.
pub fn posted_today(date_cell: &str) -> bool {
    TIME_MARKER.is_match(date_cell.trim())
}

/// Pull today's posts out of the community front page, in document order.
///
/// A pure transform: the same document always yields the same result. A
/// missing listing table means the site layout changed underneath us; that
/// degrades to an empty digest rather than failing the run.
pub fn extract(html: &str, base: &Url, today: NaiveDate) -> DigestResult {
    let document = Html::parse_document(html);
    let listing_selector = Selector::parse("table").unwrap();
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("td, th").unwrap();
    let anchor_selector = Selector::parse("a").unwrap();

    let mut posts = Vec::new();

    // The community page carries a single listing table.
    let Some(listing) = document.select(&listing_selector).next() else {
        warn!("listing table not found, site layout may have changed");
        return DigestResult { date: today, posts };
    };

    for row in listing.select(&row_selector) {
        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
        // Listing rows carry at least number, title and date columns.
        if cells.len() < 3 {
            continue;
        }

        if !cells.iter().any(|cell| posted_today(&text_of(cell))) {
            continue;
        }

        // The titled anchor carries both the title and the post link. Rows
        // without one are malformed and skipped, never fatal.
        let Some(anchor) = row
            .select(&anchor_selector)
            .find(|a| !text_of(a).trim().is_empty())
        else {
            continue;
        };
        let title = text_of(&anchor).trim().to_string();

        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(link) = base.join(href) else {
            continue;
        };
        if !matches!(link.scheme(), "http" | "https") {
            continue;
        }

        posts.push(Post {
            title,
            link: link.to_string(),
        });
    }

    DigestResult { date: today, posts }
}

fn text_of(node: &ElementRef) -> String {
    node.text().collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://coos.kr/community").unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    fn listing(rows: &str) -> String {
        format!("<html><body><table><tbody>{rows}</tbody></table></body></html>")
    }

    const SCENARIO: &str = r#"
        <tr><th>번호</th><th>제목</th><th>날짜</th></tr>
        <tr><td>3</td><td><a href="/notice/1">공지</a></td><td>01-01</td></tr>
        <tr><td>2</td><td><a href="/p/10">오늘글1</a></td><td>09:15</td></tr>
        <tr><td>1</td><td><a href="/p/11">오늘글2</a></td><td>23:59</td></tr>
    "#;

    #[test]
    fn time_marker_means_today() {
        assert!(posted_today("09:15"));
        assert!(posted_today("23:59"));
        assert!(posted_today("  14:02  "));
    }

    #[test]
    fn anything_else_means_not_today() {
        assert!(!posted_today("2024-01-01"));
        assert!(!posted_today("01-01"));
        assert!(!posted_today("9:15"));
        assert!(!posted_today("12:34:56"));
        assert!(!posted_today("12:34 PM"));
        assert!(!posted_today("January 1"));
        assert!(!posted_today(""));
    }

    #[test]
    fn keeps_todays_rows_and_drops_dated_ones() {
        let digest = extract(&listing(SCENARIO), &base(), today());
        assert_eq!(
            digest.posts,
            vec![
                Post {
                    title: "오늘글1".to_string(),
                    link: "https://coos.kr/p/10".to_string(),
                },
                Post {
                    title: "오늘글2".to_string(),
                    link: "https://coos.kr/p/11".to_string(),
                },
            ]
        );
        assert_eq!(digest.date, today());
    }

    #[test]
    fn extraction_is_idempotent() {
        let html = listing(SCENARIO);
        let first = extract(&html, &base(), today());
        let second = extract(&html, &base(), today());
        assert_eq!(first, second);
    }

    #[test]
    fn preserves_document_order() {
        let forward = listing(
            r#"
            <tr><td>2</td><td><a href="/p/1">first</a></td><td>08:00</td></tr>
            <tr><td>1</td><td><a href="/p/2">second</a></td><td>09:00</td></tr>
            "#,
        );
        let reversed = listing(
            r#"
            <tr><td>1</td><td><a href="/p/2">second</a></td><td>09:00</td></tr>
            <tr><td>2</td><td><a href="/p/1">first</a></td><td>08:00</td></tr>
            "#,
        );

        let forward_titles: Vec<_> = extract(&forward, &base(), today())
            .posts
            .into_iter()
            .map(|p| p.title)
            .collect();
        let reversed_titles: Vec<_> = extract(&reversed, &base(), today())
            .posts
            .into_iter()
            .map(|p| p.title)
            .collect();

        assert_eq!(forward_titles, vec!["first", "second"]);
        let mut expected = forward_titles;
        expected.reverse();
        assert_eq!(reversed_titles, expected);
    }

    #[test]
    fn missing_listing_table_yields_empty_digest() {
        let digest = extract("<html><body><p>moved</p></body></html>", &base(), today());
        assert!(digest.posts.is_empty());
        assert_eq!(digest.date, today());
    }

    #[test]
    fn no_matching_rows_yields_empty_digest() {
        let html = listing(
            r#"<tr><td>1</td><td><a href="/p/1">old</a></td><td>2023-12-31</td></tr>"#,
        );
        assert!(extract(&html, &base(), today()).posts.is_empty());
    }

    #[test]
    fn resolves_relative_links_against_base_origin() {
        let html = listing(
            r#"<tr><td>1</td><td><a href="/board/view?id=5">글</a></td><td>10:00</td></tr>"#,
        );
        let digest = extract(&html, &base(), today());
        assert_eq!(digest.posts[0].link, "https://coos.kr/board/view?id=5");
    }

    #[test]
    fn passes_absolute_links_through() {
        let html = listing(
            r#"<tr><td>1</td><td><a href="https://coos.kr/p/7">글</a></td><td>10:00</td></tr>"#,
        );
        let digest = extract(&html, &base(), today());
        assert_eq!(digest.posts[0].link, "https://coos.kr/p/7");
    }

    #[test]
    fn skips_malformed_rows_but_keeps_valid_ones() {
        let html = listing(
            r#"
            <tr><td>5</td><td>no anchor here</td><td>08:30</td></tr>
            <tr><td>4</td><td><a>missing href</a></td><td>08:45</td></tr>
            <tr><td>3</td><td><a href="javascript:void(0)">스크립트</a></td><td>08:50</td></tr>
            <tr><td>2</td><td><a href="/p/20">   </a></td><td>08:55</td></tr>
            <tr><td>1</td><td><a href="/p/21">  유효글  </a></td><td>09:00</td></tr>
            <tr><td><a href="/p/22">too few cells</a></td></tr>
            "#,
        );
        let digest = extract(&html, &base(), today());
        assert_eq!(
            digest.posts,
            vec![Post {
                title: "유효글".to_string(),
                link: "https://coos.kr/p/21".to_string(),
            }]
        );
    }
}
