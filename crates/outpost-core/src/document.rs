//! Typed views over fetched game pages.
//!
//! This is the only module that knows what the game's HTML looks like.
//! Every rule here is a heuristic observed on live pages (heading text,
//! link classes, marker phrases), so each parser returns either a typed
//! view or [`CoreError::LayoutMismatch`], never a partially guessed value.

use std::collections::BTreeSet;

use outpost_types::{Coordinate, Slot, SlotPosition, UpgradeToken, VillageSummary};
use scraper::{ElementRef, Html, Selector};

use crate::error::CoreError;
use crate::fetch::{Document, Submission};

/// Phrase shown on a slot page that offers new construction.
const NEW_BUILDING_MARKER: &str = "construction of a new building";

/// Phrase shown on a map tile that can be settled.
const EMPTY_PLOT_MARKER: &str = "building a new village";

/// A construct link offered on an empty slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructOption {
    /// Building-type id from the link's `b` parameter.
    pub building_id: u32,
    /// Link target.
    pub href: String,
}

/// A classified slot page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPage {
    /// The slot as observed.
    pub slot: Slot,
    /// Construct links, only present on empty slots.
    pub construct_options: Vec<ConstructOption>,
}

impl SlotPage {
    /// The construct link for `building_id`, if offered.
    pub fn construct_link(&self, building_id: u32) -> Option<&ConstructOption> {
        self.construct_options
            .iter()
            .find(|option| option.building_id == building_id)
    }
}

/// A classified map tile page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapTilePage {
    /// Whether the tile is free for a new village.
    pub empty: bool,
    /// The settle action, when the tile offers one.
    pub settle: Option<Submission>,
}

/// Culture figures read from the account statistics page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CultureOverview {
    /// Accumulated culture points.
    pub points: u64,
    /// Distinct villages linked from the page; 0 when the page has no
    /// village switcher.
    pub villages: usize,
}

/// Residence (or palace) training page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidencePage {
    /// Settlers currently available in the village.
    pub settlers: u32,
    /// Form field that carries the settler training amount.
    pub settler_field: Option<String>,
    /// Training form action, when the page has one.
    pub form_action: Option<String>,
    /// Hidden fields of the training form (CSRF and similar).
    pub hidden_fields: Vec<(String, String)>,
}

fn selector(css: &str) -> Result<Selector, CoreError> {
    Selector::parse(css).map_err(|e| CoreError::LayoutMismatch(format!("bad selector {css}: {e}")))
}

/// Element text with whitespace collapsed.
fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Value of query parameter `key` in a link target.
pub fn query_param<'a>(href: &'a str, key: &str) -> Option<&'a str> {
    let query = href.split_once('?').map_or(href, |(_, query)| query);
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == key)
        .map(|(_, value)| value)
}

/// Split `"Woodcutter level 10"` into `("Woodcutter", Some(10))`.
///
/// Headings without a numeric level suffix come back unchanged with
/// `None`.
pub fn split_level(heading: &str) -> (String, Option<u32>) {
    let lower = heading.to_ascii_lowercase();
    if let Some(idx) = lower.rfind("level") {
        let rest = heading
            .get(idx.saturating_add("level".len())..)
            .unwrap_or_default()
            .trim_start();
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        if let Ok(level) = digits.parse() {
            let name = heading.get(..idx).unwrap_or_default().trim().to_owned();
            return (name, Some(level));
        }
    }
    (heading.trim().to_owned(), None)
}

/// First integer in `text`, ignoring thousands separators.
pub fn first_number(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text
        .get(start..)?
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '\u{202f}'))
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Parse a `(x|y)` coordinate out of free text.
///
/// Tolerates the bidi marks and typographic minus signs the game wraps
/// around coordinates.
pub fn parse_coordinate(text: &str) -> Option<Coordinate> {
    let cleaned: String = text
        .chars()
        .filter_map(|c| match c {
            '0'..='9' | '|' | '(' | ')' | '-' => Some(c),
            '\u{2212}' => Some('-'),
            _ => None,
        })
        .collect();
    let open = cleaned.find('(')?;
    let inner = cleaned.get(open.saturating_add(1)..)?;
    let close = inner.find(')')?;
    let (x, y) = inner.get(..close)?.split_once('|')?;
    Some(Coordinate::new(x.parse().ok()?, y.parse().ok()?))
}

/// Classify a slot page.
///
/// A heading ending in `level N` is an occupied slot. A heading without a
/// level plus the new-building marker is an empty slot. Any other heading
/// is an occupied slot at level 0 (typically a structure still under
/// construction).
pub fn parse_slot(position: SlotPosition, document: &Document) -> Result<SlotPage, CoreError> {
    let html = Html::parse_document(document.body());
    let offers_new = document
        .body()
        .to_lowercase()
        .contains(NEW_BUILDING_MARKER);
    let heading = html
        .select(&selector("h1")?)
        .map(text_of)
        .find(|text| !text.is_empty());

    let build_links: Vec<String> = html
        .select(&selector("a.build")?)
        .filter_map(|a| a.value().attr("href"))
        .map(ToOwned::to_owned)
        .collect();

    let (name, level) = match heading.as_deref() {
        Some(text) => split_level(text),
        None if offers_new => (String::new(), None),
        None => {
            return Err(CoreError::LayoutMismatch(format!(
                "slot {position}: page has no heading"
            )));
        }
    };

    if level.is_none() && offers_new {
        let construct_options = build_links
            .iter()
            .filter_map(|href| {
                let building_id = query_param(href, "b")?.parse().ok()?;
                Some(ConstructOption {
                    building_id,
                    href: href.clone(),
                })
            })
            .collect();
        return Ok(SlotPage {
            slot: Slot::empty(position),
            construct_options,
        });
    }

    let upgrade = build_links
        .into_iter()
        .find(|href| query_param(href, "k").is_some() && query_param(href, "b").is_none())
        .map(UpgradeToken);

    Ok(SlotPage {
        slot: Slot::occupied(position, name, level.unwrap_or(0), upgrade),
        construct_options: Vec::new(),
    })
}

/// Classify a map tile page.
pub fn parse_map_tile(document: &Document) -> Result<MapTilePage, CoreError> {
    let empty = document.body().to_lowercase().contains(EMPTY_PLOT_MARKER);
    if !empty {
        return Ok(MapTilePage {
            empty,
            settle: None,
        });
    }

    let html = Html::parse_document(document.body());
    let links: Vec<(String, String)> = html
        .select(&selector("a")?)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            Some((text_of(a).to_lowercase(), href.to_owned()))
        })
        .collect();

    let settle = links
        .iter()
        .find(|(text, _)| text.contains(EMPTY_PLOT_MARKER) || text.contains("settle"))
        .or_else(|| links.iter().find(|(_, href)| href.contains("a2b.php")))
        .map(|(_, href)| Submission::FollowLink { href: href.clone() });

    Ok(MapTilePage { empty, settle })
}

/// Read the village table from the profile page.
///
/// Rows without a village link or a readable coordinate are skipped.
pub fn parse_profile(document: &Document) -> Result<Vec<VillageSummary>, CoreError> {
    let html = Html::parse_document(document.body());
    let table = html
        .select(&selector("table#villages")?)
        .next()
        .ok_or_else(|| CoreError::LayoutMismatch(String::from("profile has no village table")))?;

    let row_selector = selector("tr")?;
    let cell_selector = selector("td")?;
    let link_selector = selector("a[href]")?;

    let villages = table
        .select(&row_selector)
        .filter_map(|row| {
            let cells: Vec<ElementRef<'_>> = row.select(&cell_selector).collect();
            let name = text_of(*cells.first()?);
            let village_id = row
                .select(&link_selector)
                .filter_map(|a| a.value().attr("href"))
                .find_map(|href| href.rsplit('=').next()?.parse().ok())?;
            let coordinate = cells
                .iter()
                .find_map(|cell| parse_coordinate(&text_of(*cell)))?;
            Some(VillageSummary {
                name,
                village_id,
                coordinate,
            })
        })
        .collect();
    Ok(villages)
}

/// Read accumulated culture points.
///
/// Picks the most specific element mentioning culture points that also
/// carries a number, and reads the first number after the label.
pub fn parse_culture_points(document: &Document) -> Result<u64, CoreError> {
    let html = Html::parse_document(document.body());
    let candidates = selector("tr, td, th, span, div, p, li")?;

    html.select(&candidates)
        .map(text_of)
        .filter(|text| {
            let lower = text.to_lowercase();
            (lower.contains("culture point") || lower.contains("kulturpunkte"))
                && text.chars().any(|c| c.is_ascii_digit())
        })
        .min_by_key(String::len)
        .and_then(|text| number_after(&text, &["culture point", "kulturpunkte"]))
        .ok_or_else(|| CoreError::LayoutMismatch(String::from("no culture point figure found")))
}

/// Read culture points and the village switcher from one page.
pub fn parse_culture_overview(document: &Document) -> Result<CultureOverview, CoreError> {
    let points = parse_culture_points(document)?;
    let html = Html::parse_document(document.body());
    let villages: BTreeSet<&str> = html
        .select(&selector("a[href]")?)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| query_param(href, "newdid").or_else(|| query_param(href, "vid")))
        .collect();
    Ok(CultureOverview {
        points,
        villages: villages.len(),
    })
}

/// First number after any of `labels` (case-insensitive), falling back to
/// the first number in the text.
fn number_after(text: &str, labels: &[&str]) -> Option<u64> {
    let lower = text.to_ascii_lowercase();
    labels
        .iter()
        .find_map(|label| lower.find(label).map(|idx| idx.saturating_add(label.len())))
        .and_then(|idx| text.get(idx..))
        .and_then(first_number)
        .or_else(|| first_number(text))
}

/// Read settler availability and the training form from a residence page.
pub fn parse_residence(document: &Document) -> Result<ResidencePage, CoreError> {
    let html = Html::parse_document(document.body());
    let input_selector = selector("input")?;
    let candidates = selector("tr, td, span, div, p, li")?;

    let settlers = html
        .select(&candidates)
        .filter(|el| el.select(&input_selector).next().is_none())
        .map(text_of)
        .filter(|text| {
            text.to_lowercase().contains("settler") && text.chars().any(|c| c.is_ascii_digit())
        })
        .min_by_key(String::len)
        .and_then(|text| number_after(&text, &["settlers", "settler"]))
        .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX));

    let settler_field = html
        .select(&selector("tr")?)
        .filter(|row| text_of(*row).to_lowercase().contains("settler"))
        .flat_map(|row| row.select(&input_selector).collect::<Vec<_>>())
        .filter_map(|input| input.value().attr("name"))
        .find(|name| name.starts_with("t["))
        .map(ToOwned::to_owned);

    let form = html.select(&selector("form")?).find(|form| {
        form.select(&input_selector)
            .filter_map(|input| input.value().attr("name"))
            .any(|name| name.starts_with("t["))
    });

    let form_action = form
        .and_then(|form| form.value().attr("action"))
        .map(ToOwned::to_owned);
    let hidden_fields = form
        .map(|form| {
            form.select(&input_selector)
                .filter(|input| input.value().attr("type") == Some("hidden"))
                .filter_map(|input| {
                    let name = input.value().attr("name")?;
                    let value = input.value().attr("value").unwrap_or_default();
                    Some((name.to_owned(), value.to_owned()))
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ResidencePage {
        settlers,
        settler_field,
        form_action,
        hidden_fields,
    })
}

/// Find the celebration action on a town hall page.
///
/// Prefers an action link; falls back to a form whose submit control
/// mentions a celebration. `fallback_action` is used when that form has no
/// `action` attribute.
pub fn parse_celebration(
    document: &Document,
    fallback_action: &str,
) -> Result<Option<Submission>, CoreError> {
    let html = Html::parse_document(document.body());

    let link = html
        .select(&selector("a[href]")?)
        .find(|a| {
            let text = text_of(*a).to_lowercase();
            let href = a.value().attr("href").unwrap_or_default();
            text.contains("celebration") && query_param(href, "a").is_some()
        })
        .and_then(|a| a.value().attr("href"))
        .map(|href| Submission::FollowLink {
            href: href.to_owned(),
        });
    if link.is_some() {
        return Ok(link);
    }

    let submit_selector = selector("button, input[type=submit], input[type=image]")?;
    let input_selector = selector("input[name]")?;
    let form = html.select(&selector("form")?).find(|form| {
        form.select(&submit_selector).any(|control| {
            let label = format!(
                "{} {}",
                control.value().attr("value").unwrap_or_default(),
                text_of(control)
            );
            label.to_lowercase().contains("celebration")
        })
    });

    Ok(form.map(|form| {
        let fields = form
            .select(&input_selector)
            .filter_map(|input| {
                let name = input.value().attr("name")?;
                let value = input.value().attr("value").unwrap_or_default();
                Some((name.to_owned(), value.to_owned()))
            })
            .collect();
        Submission::PostForm {
            action: form
                .value()
                .attr("action")
                .unwrap_or(fallback_action)
                .to_owned(),
            fields,
        }
    }))
}
