use serde::Serialize;

use crate::model::PageContent;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageSummary {
    pub page_number: u32,
    pub text_chars: usize,
    pub tables: usize,
    pub images: usize,
    pub empty: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentSummary {
    pub pages: Vec<PageSummary>,
    pub total_text_chars: usize,
    pub total_tables: usize,
    pub total_images: usize,
}

#[must_use]
pub fn summarize(pages: &[PageContent]) -> DocumentSummary {
    let pages = pages
        .iter()
        .map(|page| {
            let text_chars = page.text.as_deref().map_or(0, |text| text.chars().count());
            PageSummary {
                page_number: page.page_number,
                text_chars,
                tables: page.tables.len(),
                images: page.images.len(),
                empty: text_chars == 0 && page.tables.is_empty() && page.images.is_empty(),
            }
        })
        .collect::<Vec<_>>();

    DocumentSummary {
        total_text_chars: pages.iter().map(|page| page.text_chars).sum(),
        total_tables: pages.iter().map(|page| page.tables).sum(),
        total_images: pages.iter().map(|page| page.images).sum(),
        pages,
    }
}

fn summary_row(label: &str, text_chars: usize, tables: usize, images: usize) -> String {
    format!("{label:<6} {text_chars:<12} {tables:<8} {images:<8}")
}

#[must_use]
pub fn render_summary(summary: &DocumentSummary) -> String {
    let rule = "-".repeat(60);

    let mut lines = vec![
        format!("Total Pages: {}", summary.pages.len()),
        format!(
            "{:<6} {:<12} {:<8} {:<8} Status",
            "Page", "Text Chars", "Tables", "Images"
        ),
        rule.clone(),
    ];
    lines.extend(summary.pages.iter().map(|page| {
        let status = if page.empty { "empty" } else { "ok" };
        let row = summary_row(
            &page.page_number.to_string(),
            page.text_chars,
            page.tables,
            page.images,
        );
        format!("{row} {status}")
    }));
    lines.push(rule);
    lines.push(summary_row(
        "TOTAL",
        summary.total_text_chars,
        summary.total_tables,
        summary.total_images,
    ));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::{render_summary, summarize};
    use crate::model::{ImageContent, PageContent};

    #[test]
    fn counts_per_page_and_totals() {
        let pages = vec![
            PageContent {
                page_number: 1,
                text: Some("héllo".to_string()),
                tables: Vec::new(),
                images: vec![ImageContent {
                    image_id: "image_p1_i1".to_string(),
                    description: "Image 1".to_string(),
                    ocr_text: None,
                }],
            },
            PageContent {
                page_number: 2,
                text: None,
                tables: Vec::new(),
                images: Vec::new(),
            },
        ];

        let summary = summarize(&pages);
        assert_eq!(summary.pages[0].text_chars, 5);
        assert!(!summary.pages[0].empty);
        assert!(summary.pages[1].empty);
        assert_eq!(summary.total_text_chars, 5);
        assert_eq!(summary.total_images, 1);
        assert_eq!(summary.total_tables, 0);

        let rendered = render_summary(&summary);
        assert!(rendered.starts_with("Total Pages: 2\n"));
        assert!(rendered.contains("2      0            0        0        empty"));
    }

    #[test]
    fn report_ends_every_line_with_a_newline() {
        let summary = summarize(&[PageContent {
            page_number: 1,
            text: Some("abc".to_string()),
            tables: Vec::new(),
            images: Vec::new(),
        }]);
        let rule = "-".repeat(60);
        let expected = format!(
            "Total Pages: 1\n\
             Page   Text Chars   Tables   Images   Status\n\
             {rule}\n\
             1      3            0        0        ok\n\
             {rule}\n\
             TOTAL  3            0        0       \n"
        );
        assert_eq!(render_summary(&summary), expected);
    }
}
