//! Markdown and JSON rendering.
//!
//! Each view is built section by section into a `String`; JSON output is
//! the pretty-printed serde form of the same model.

use crate::models::{Dashboard, IconTable, Post, PostBody, PostPage, PostView, Quote, WeatherReport};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

const UNAVAILABLE: &str = "—";

/// Render the weather dashboard as a Markdown table.
pub fn generate_dashboard_markdown(dashboard: &Dashboard, icons: &IconTable) -> String {
    let mut output = String::new();

    output.push_str("# Weather Dashboard\n\n");
    output.push_str(&format!(
        "*Updated {}*\n\n",
        dashboard.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output.push_str("| | City | Condition | Temp | High | Low |\n");
    output.push_str("|:---:|:---|:---|:---:|:---:|:---:|\n");
    for report in &dashboard.reports {
        output.push_str(&generate_weather_row(report, icons));
    }
    output.push('\n');

    if !dashboard.failed.is_empty() {
        output.push_str(&format!(
            "> ⚠️ Could not load weather for {} of {} cities: {}\n\n",
            dashboard.failed.len(),
            dashboard.reports.len(),
            dashboard.failed.join(", ")
        ));
    }

    output
}

fn generate_weather_row(report: &WeatherReport, icons: &IconTable) -> String {
    let degrees = |value: i32| format!("{}°C", value);

    match report.reading {
        Some(reading) => format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            icons.icon(report.condition),
            report.city,
            report.summary,
            degrees(reading.temperature),
            degrees(reading.high),
            degrees(reading.low),
        ),
        None => format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            icons.fallback, report.city, report.summary, UNAVAILABLE, UNAVAILABLE, UNAVAILABLE,
        ),
    }
}

/// Render a run of quotes as block quotes.
pub fn generate_quotes_markdown(quotes: &[Quote], deck_size: usize) -> String {
    let mut output = String::new();

    output.push_str("# Quotes\n\n");

    if quotes.is_empty() {
        output.push_str("No quotes available.\n");
        return output;
    }

    for quote in quotes {
        output.push_str(&format!("> {}\n>\n> — *{}*\n\n", quote.quote, quote.author));
    }

    output.push_str(&format!(
        "*Showing {} of {} quotes*\n",
        quotes.len(),
        deck_size
    ));

    output
}

/// Render one page of the news feed.
pub fn generate_feed_markdown(page: &PostPage) -> String {
    let mut output = String::new();

    output.push_str("# News\n\n");
    if let Some(ref term) = page.search {
        output.push_str(&format!("*Search: \"{}\"*\n\n", term));
    }

    if page.posts.is_empty() {
        match page.search {
            Some(ref term) => {
                output.push_str(&format!("No posts found matching \"{}\".\n", term))
            }
            None => output.push_str("No posts available.\n"),
        }
        return output;
    }

    for post in &page.posts {
        output.push_str(&format!("## {}\n\n", post.title));
        output.push_str(&generate_byline(post));
        output.push_str(&format!("{}\n\n", post.excerpt));
        output.push_str(&format!("`{}` · id {}\n\n", post.slug, post.id));
    }

    output.push_str("---\n\n");
    output.push_str(&format!(
        "*Showing {} of {} posts (Page {} of {})*\n",
        page.posts.len(),
        page.total,
        page.page,
        page.page_count
    ));

    output
}

/// Render full posts, including placeholders for ones that failed.
pub fn generate_posts_markdown(views: &[PostView]) -> String {
    let mut output = String::new();

    for view in views {
        match view {
            PostView::Found(post) => output.push_str(&generate_post(post)),
            PostView::Missing { reference, reason } => {
                output.push_str(&format!("# ⚠️ {}\n\n> {}\n\n", reference, reason));
            }
        }
        output.push_str("---\n\n");
    }

    output
}

fn generate_post(post: &Post) -> String {
    let mut section = String::new();

    section.push_str(&format!("# {}\n\n", post.title));
    section.push_str(&generate_byline(post));

    if let Some(ref url) = post.cover_url {
        section.push_str(&format!("![{}]({})\n\n", post.title, url));
    }

    match post.body {
        PostBody::Markdown(ref text) => {
            section.push_str(text.trim_end());
            section.push_str("\n\n");
        }
        PostBody::Plain(ref lines) => {
            // Blank lines separate paragraphs
            for paragraph in lines.split(|line| line.trim().is_empty()) {
                if paragraph.is_empty() {
                    continue;
                }
                section.push_str(&paragraph.join("  \n"));
                section.push_str("\n\n");
            }
        }
        PostBody::Empty => section.push_str("*No content available.*\n\n"),
    }

    section
}

fn generate_byline(post: &Post) -> String {
    let mut byline = format!("*By {} · {}", post.author, post.category);
    if let Some(created_at) = post.created_at {
        byline.push_str(&format!(" · {}", created_at.format("%B %-d, %Y")));
    }
    byline.push_str("*\n\n");
    byline
}

/// Pretty-printed JSON for any view model.
pub fn generate_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

/// Write rendered output to `path`.
pub fn write_output(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write output to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, Reading};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn create_test_dashboard() -> Dashboard {
        Dashboard {
            generated_at: Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap(),
            reports: vec![
                WeatherReport {
                    city: "Kampala".to_string(),
                    condition: Condition::PartlyCloudy,
                    summary: "Partly cloudy".to_string(),
                    reading: Some(Reading {
                        temperature: 25,
                        high: 28,
                        low: 22,
                    }),
                },
                WeatherReport::unavailable("Gulu"),
            ],
            failed: vec!["Gulu".to_string()],
        }
    }

    fn create_test_post() -> Post {
        Post {
            id: 6,
            title: "Rainy Season Outlook".to_string(),
            slug: "rainy-season-outlook".to_string(),
            author: "Unknown Author".to_string(),
            category: "Weather".to_string(),
            created_at: Some(Utc.with_ymd_and_hms(2026, 10, 17, 6, 0, 0).unwrap()),
            cover_url: None,
            excerpt: "Expect heavy showers. Plan ahead....".to_string(),
            body: PostBody::Plain(vec![
                "Expect heavy showers.".to_string(),
                String::new(),
                "Plan ahead.".to_string(),
            ]),
        }
    }

    #[test]
    fn test_dashboard_markdown() {
        let markdown = generate_dashboard_markdown(&create_test_dashboard(), &IconTable::default());

        assert!(markdown.contains("# Weather Dashboard"));
        assert!(markdown.contains("*Updated 2026-10-19 08:00:00 UTC*"));
        assert!(markdown.contains("| ⛅ | Kampala | Partly cloudy | 25°C | 28°C | 22°C |"));
        assert!(markdown.contains("| ☀️ | Gulu | Unavailable | — | — | — |"));
        assert!(markdown.contains("Could not load weather for 1 of 2 cities: Gulu"));
    }

    #[test]
    fn test_dashboard_uses_icon_overrides() {
        let icons = IconTable::default()
            .with_overrides([(Condition::PartlyCloudy, "assets/partly.png".to_string())]);
        let markdown = generate_dashboard_markdown(&create_test_dashboard(), &icons);

        assert!(markdown.contains("| assets/partly.png | Kampala |"));
    }

    #[test]
    fn test_quotes_markdown() {
        let quotes = vec![Quote {
            id: 1,
            quote: "Be yourself.".to_string(),
            author: "Rumi".to_string(),
        }];

        let markdown = generate_quotes_markdown(&quotes, 30);
        assert!(markdown.contains("> Be yourself."));
        assert!(markdown.contains("*Rumi*"));
        assert!(markdown.contains("*Showing 1 of 30 quotes*"));

        assert!(generate_quotes_markdown(&[], 0).contains("No quotes available."));
    }

    #[test]
    fn test_feed_markdown_footer() {
        let page = PostPage {
            posts: vec![create_test_post()],
            page: 2,
            page_count: 3,
            total: 14,
            search: None,
        };

        let markdown = generate_feed_markdown(&page);
        assert!(markdown.contains("## Rainy Season Outlook"));
        assert!(markdown.contains("*By Unknown Author · Weather · October 17, 2026*"));
        assert!(markdown.contains("Expect heavy showers. Plan ahead....\n\n"));
        assert!(markdown.contains("*Showing 1 of 14 posts (Page 2 of 3)*"));
    }

    #[test]
    fn test_feed_markdown_empty_search() {
        let page = PostPage {
            posts: Vec::new(),
            page: 1,
            page_count: 1,
            total: 0,
            search: Some("drought".to_string()),
        };

        let markdown = generate_feed_markdown(&page);
        assert!(markdown.contains("No posts found matching \"drought\"."));
        assert!(!markdown.contains("Showing"));

        let unfiltered = PostPage {
            search: None,
            ..page
        };
        assert!(generate_feed_markdown(&unfiltered).contains("No posts available."));
    }

    #[test]
    fn test_posts_markdown() {
        let mut with_cover = create_test_post();
        with_cover.cover_url = Some("http://localhost:1337/uploads/rain.jpg".to_string());
        with_cover.body = PostBody::Markdown("## Heading\n\n**bold**\n".to_string());

        let views = vec![
            PostView::Found(create_test_post()),
            PostView::Missing {
                reference: "99".to_string(),
                reason: "Post not found.".to_string(),
            },
            PostView::Found(with_cover),
        ];

        let markdown = generate_posts_markdown(&views);
        assert!(markdown.contains("Expect heavy showers.\n\nPlan ahead.\n\n"));
        assert!(markdown.contains("# ⚠️ 99\n\n> Post not found."));
        assert!(markdown.contains("![Rainy Season Outlook](http://localhost:1337/uploads/rain.jpg)"));
        assert!(markdown.contains("## Heading\n\n**bold**\n\n"));
    }

    #[test]
    fn test_empty_post_body() {
        let mut post = create_test_post();
        post.body = PostBody::Empty;

        assert!(generate_post(&post).contains("*No content available.*"));
    }

    #[test]
    fn test_generate_json() {
        let json = generate_json(&create_test_dashboard()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["reports"][0]["condition"], "partly_cloudy");
        assert_eq!(parsed["reports"][1]["reading"], serde_json::Value::Null);
        assert_eq!(parsed["failed"][0], "Gulu");

        let views = vec![PostView::Missing {
            reference: "x".to_string(),
            reason: "gone".to_string(),
        }];
        let json = generate_json(&views).unwrap();
        assert!(json.contains("\"status\": \"missing\""));
    }

    #[test]
    fn test_write_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.md");

        write_output("# Weather Dashboard\n", &path).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# Weather Dashboard\n"
        );
    }
}
