//! Parsing of the paginated circular listing.
//!
//! The listing is a Joomla page whose second `<table>` holds one row per
//! circular: number, linked title, issue date (`YYYY-MM-DD`). Rows whose
//! date does not parse are dropped silently — decorative rows and header
//! rows, not errors.

use chrono::NaiveDate;
use scraper::{Html, Selector};

use super::client::resolve_url;
use super::ScrapeError;
use crate::models::ListedCircular;

/// Build the listing URL for a pagination offset.
pub fn listing_url(base_url: &str, offset: u32) -> String {
    if offset == 0 {
        format!("{base_url}/web/index.php?option=com_circular&view=circulars&Itemid=176&lang=en")
    } else {
        format!(
            "{base_url}/web/index.php?Itemid=176&lang=en&option=com_circular\
             &view=circulars&limitstart={offset}"
        )
    }
}

fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css)
        .map_err(|e| ScrapeError::HtmlStructure(format!("bad selector {css}: {e}")))
}

/// Parse one listing page into circular rows, in page order.
///
/// Returns an empty vec when the page has no circular table — the caller
/// treats that as the end of pagination.
pub fn parse_listing(html: &str, page_url: &str) -> Result<Vec<ListedCircular>, ScrapeError> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let link_sel = selector("a[href]")?;

    // The circular table is the second one on the page; anything less
    // means we paginated past the end.
    let Some(table) = document.select(&table_sel).nth(1) else {
        return Ok(Vec::new());
    };

    let mut rows = Vec::new();
    for tr in table.select(&row_sel) {
        let cells: Vec<_> = tr.select(&cell_sel).collect();
        if cells.len() < 3 {
            continue;
        }

        let number = cell_text(&cells[0]);
        let title = cell_text(&cells[1]);
        let date_str = cell_text(&cells[2]);

        let Ok(date) = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d") else {
            continue;
        };

        let detail_url = cells[1]
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve_url(page_url, href).ok());

        rows.push(ListedCircular {
            number,
            title,
            date,
            detail_url,
        });
    }

    Ok(rows)
}

fn cell_text(cell: &scraper::ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}
