//! Book layout for songbook viewing. Pages are laid out the way a printed
//! songbook opens: covers on the outside, blank fillers where a section has to
//! start on a particular side, and every opening shown as a left/right pair.
//!
//! Everything here is a pure function of its input. The viewer recomputes the
//! layout whenever a songbook is opened, so nothing in this module is cached
//! or persisted.

use std::fmt;

/// What a single page position shows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageContent {
    /// Reference to a page image, relative to the configured image root.
    Image(String),
    /// A white page that still takes up room in the book.
    Blank,
    /// Not a page at all: the space beside a closed cover.
    Nothing,
}

impl PageContent {
    /// Image reference, if the slot carries one.
    pub fn image(&self) -> Option<&str> {
        match self {
            PageContent::Image(path) => Some(path),
            PageContent::Blank | PageContent::Nothing => None,
        }
    }

    /// True for the two filler variants.
    pub fn is_filler(&self) -> bool {
        !matches!(self, PageContent::Image(_))
    }
}

/// Presentation hint for a slot. Placement never depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Cover,
    Intro,
    Content,
    Outro,
}

impl PageKind {
    pub fn label(self) -> &'static str {
        match self {
            PageKind::Cover => "cover",
            PageKind::Intro => "intro",
            PageKind::Content => "content",
            PageKind::Outro => "outro",
        }
    }
}

/// One logical page position in the book.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageSlot {
    pub content: PageContent,
    pub kind: PageKind,
    /// Printed page number. Only content pages carry one.
    pub page_number: Option<u32>,
}

impl PageSlot {
    pub fn cover(image: Option<&str>) -> Self {
        Self {
            content: image.map_or(PageContent::Blank, |path| PageContent::Image(path.to_string())),
            kind: PageKind::Cover,
            page_number: None,
        }
    }

    pub fn intro(image: impl Into<String>) -> Self {
        Self {
            content: PageContent::Image(image.into()),
            kind: PageKind::Intro,
            page_number: None,
        }
    }

    pub fn outro(image: impl Into<String>) -> Self {
        Self {
            content: PageContent::Image(image.into()),
            kind: PageKind::Outro,
            page_number: None,
        }
    }

    /// A numbered content page. `None` for the image produces an
    /// intentionally empty page that still counts towards numbering.
    pub fn content(image: Option<String>, page_number: u32) -> Self {
        Self {
            content: image.map_or(PageContent::Blank, PageContent::Image),
            kind: PageKind::Content,
            page_number: Some(page_number),
        }
    }

    /// Unnumbered white filler.
    pub fn blank() -> Self {
        Self {
            content: PageContent::Blank,
            kind: PageKind::Content,
            page_number: None,
        }
    }

    /// Placeholder outside a closed cover.
    pub fn nothing() -> Self {
        Self {
            content: PageContent::Nothing,
            kind: PageKind::Cover,
            page_number: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.content == PageContent::Blank
    }

    pub fn is_nothing(&self) -> bool {
        self.content == PageContent::Nothing
    }
}

/// Side of an opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageSide {
    Left,
    #[default]
    Right,
}

impl PageSide {
    /// Parse the stored column value. Anything unrecognised falls back to the
    /// column default.
    pub fn from_db(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => PageSide::Left,
            _ => PageSide::Right,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageSide::Left => "left",
            PageSide::Right => "right",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            PageSide::Left => PageSide::Right,
            PageSide::Right => PageSide::Left,
        }
    }
}

impl fmt::Display for PageSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four cover faces. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverImages {
    pub front_outer: Option<String>,
    pub front_inner: Option<String>,
    pub back_inner: Option<String>,
    pub back_outer: Option<String>,
}

impl CoverImages {
    pub fn any(&self) -> bool {
        self.front_outer.is_some()
            || self.front_inner.is_some()
            || self.back_inner.is_some()
            || self.back_outer.is_some()
    }
}

/// Everything the layout needs to know about one songbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutInput {
    /// Where the first real page lands when there is no cover, or where the
    /// book resumes after the inner front cover.
    pub first_page_side: PageSide,
    pub intro_images: Vec<String>,
    /// Content slots in reading order, already numbered.
    pub content_pages: Vec<PageSlot>,
    pub outro_images: Vec<String>,
    pub covers: CoverImages,
}

/// Two pages shown side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spread {
    pub left: PageSlot,
    pub right: PageSlot,
}

/// Result of laying out a songbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookLayout {
    pub spreads: Vec<Spread>,
    /// Every slot with an image, in reading order, for continuous scrolling.
    pub scroll_list: Vec<PageSlot>,
}

impl BookLayout {
    /// Index of the spread that shows the given printed page number.
    pub fn spread_index_of_page(&self, page_number: u32) -> Option<usize> {
        self.spreads.iter().position(|spread| {
            spread.left.page_number == Some(page_number)
                || spread.right.page_number == Some(page_number)
        })
    }

    /// Index within the scroll list of the given printed page number. Blank
    /// content pages are not in the scroll list, so the next page after them
    /// is used instead.
    pub fn scroll_index_of_page(&self, page_number: u32) -> Option<usize> {
        self.scroll_list
            .iter()
            .position(|slot| slot.page_number.is_some_and(|n| n >= page_number))
    }

    pub fn page_count(&self) -> usize {
        self.spreads.len() * 2
    }
}

/// Lay out a songbook into spreads plus the flat scroll list.
pub fn build_spreads(input: &LayoutInput) -> BookLayout {
    let slots = arrange_pages(input);
    let scroll_list = slots
        .iter()
        .filter(|slot| !slot.content.is_filler())
        .cloned()
        .collect();

    BookLayout {
        spreads: pair_slots(slots),
        scroll_list,
    }
}

/// Produce the flat, even-length page sequence before it is cut into spreads.
pub fn arrange_pages(input: &LayoutInput) -> Vec<PageSlot> {
    let covers = &input.covers;
    let mut slots = Vec::with_capacity(
        input.intro_images.len() + input.content_pages.len() + input.outro_images.len() + 8,
    );

    if covers.any() {
        slots.push(PageSlot::nothing());
        slots.push(PageSlot::cover(covers.front_outer.as_deref()));
        slots.push(PageSlot::cover(covers.front_inner.as_deref()));
        if input.first_page_side == PageSide::Left {
            slots.push(PageSlot::blank());
        }

        push_body(&mut slots, input);

        // An even count means the next slot opens a new spread on the left;
        // the inner back cover belongs on the right.
        if slots.len() % 2 == 0 {
            slots.push(PageSlot::blank());
        }
        slots.push(PageSlot::cover(covers.back_inner.as_deref()));
        slots.push(PageSlot::cover(covers.back_outer.as_deref()));
        slots.push(PageSlot::nothing());
    } else {
        if input.first_page_side == PageSide::Right {
            slots.push(PageSlot::blank());
        }

        push_body(&mut slots, input);

        if slots.len() % 2 == 1 {
            slots.push(PageSlot::blank());
        }
    }

    slots
}

fn push_body(slots: &mut Vec<PageSlot>, input: &LayoutInput) {
    slots.extend(input.intro_images.iter().map(PageSlot::intro));
    slots.extend(input.content_pages.iter().cloned());
    slots.extend(input.outro_images.iter().map(PageSlot::outro));
}

/// Cut a flat sequence into left/right pairs. A trailing odd slot is dropped;
/// `arrange_pages` never produces one.
pub fn pair_slots(slots: Vec<PageSlot>) -> Vec<Spread> {
    debug_assert!(slots.len() % 2 == 0, "odd page sequence: {}", slots.len());

    let mut spreads = Vec::with_capacity(slots.len() / 2);
    let mut iter = slots.into_iter();
    while let (Some(left), Some(right)) = (iter.next(), iter.next()) {
        spreads.push(Spread { left, right });
    }
    spreads
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(name: &str, number: u32) -> PageSlot {
        PageSlot::content(Some(name.to_string()), number)
    }

    fn pages(names: &[&str]) -> Vec<PageSlot> {
        names
            .iter()
            .enumerate()
            .map(|(idx, name)| page(name, idx as u32 + 1))
            .collect()
    }

    fn full_covers() -> CoverImages {
        CoverImages {
            front_outer: Some("F".into()),
            front_inner: Some("f".into()),
            back_inner: Some("b".into()),
            back_outer: Some("B".into()),
        }
    }

    /// Short textual form of a slot: image name, `_` for blank, `x` for nothing.
    fn code(slot: &PageSlot) -> String {
        match &slot.content {
            PageContent::Image(path) => path.clone(),
            PageContent::Blank => "_".into(),
            PageContent::Nothing => "x".into(),
        }
    }

    fn codes(slots: &[PageSlot]) -> Vec<String> {
        slots.iter().map(code).collect()
    }

    fn spread_codes(layout: &BookLayout) -> Vec<(String, String)> {
        layout
            .spreads
            .iter()
            .map(|s| (code(&s.left), code(&s.right)))
            .collect()
    }

    fn pair(left: &str, right: &str) -> (String, String) {
        (left.to_string(), right.to_string())
    }

    #[test]
    fn no_cover_left_start_pads_the_tail() {
        let input = LayoutInput {
            first_page_side: PageSide::Left,
            content_pages: pages(&["A", "B", "C"]),
            ..Default::default()
        };

        assert_eq!(codes(&arrange_pages(&input)), ["A", "B", "C", "_"]);
        assert_eq!(
            spread_codes(&build_spreads(&input)),
            [pair("A", "B"), pair("C", "_")]
        );
    }

    #[test]
    fn no_cover_right_start_leads_with_blank() {
        let input = LayoutInput {
            first_page_side: PageSide::Right,
            content_pages: pages(&["A", "B"]),
            ..Default::default()
        };

        assert_eq!(codes(&arrange_pages(&input)), ["_", "A", "B", "_"]);
        assert_eq!(
            spread_codes(&build_spreads(&input)),
            [pair("_", "A"), pair("B", "_")]
        );
    }

    #[test]
    fn full_cover_left_start_single_page() {
        let input = LayoutInput {
            first_page_side: PageSide::Left,
            content_pages: pages(&["A"]),
            covers: full_covers(),
            ..Default::default()
        };

        assert_eq!(
            codes(&arrange_pages(&input)),
            ["x", "F", "f", "_", "A", "b", "B", "x"]
        );
        assert_eq!(
            spread_codes(&build_spreads(&input)),
            [pair("x", "F"), pair("f", "_"), pair("A", "b"), pair("B", "x")]
        );
    }

    #[test]
    fn full_cover_right_start_pushes_back_cover_to_the_right() {
        let input = LayoutInput {
            first_page_side: PageSide::Right,
            content_pages: pages(&["A"]),
            covers: full_covers(),
            ..Default::default()
        };

        assert_eq!(
            spread_codes(&build_spreads(&input)),
            [pair("x", "F"), pair("f", "A"), pair("_", "b"), pair("B", "x")]
        );
    }

    #[test]
    fn partial_cover_still_uses_cover_branch() {
        let input = LayoutInput {
            first_page_side: PageSide::Right,
            content_pages: pages(&["A", "B"]),
            covers: CoverImages {
                front_outer: Some("F".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        assert_eq!(
            codes(&arrange_pages(&input)),
            ["x", "F", "_", "A", "B", "_", "_", "x"]
        );
    }

    #[test]
    fn only_back_cover_present() {
        let input = LayoutInput {
            first_page_side: PageSide::Left,
            covers: CoverImages {
                back_outer: Some("B".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        assert_eq!(
            codes(&arrange_pages(&input)),
            ["x", "_", "_", "_", "_", "_", "B", "x"]
        );
        let slots = arrange_pages(&input);
        assert_eq!(slots.len() % 2, 0);
        assert!(slots.first().is_some_and(PageSlot::is_nothing));
        assert!(slots.last().is_some_and(PageSlot::is_nothing));
        assert_eq!(code(&slots[slots.len() - 2]), "B");
    }

    #[test]
    fn intro_and_outro_wrap_content() {
        let input = LayoutInput {
            first_page_side: PageSide::Left,
            intro_images: vec!["i1".into(), "i2".into()],
            content_pages: pages(&["A"]),
            outro_images: vec!["o1".into()],
            ..Default::default()
        };

        let slots = arrange_pages(&input);
        assert_eq!(codes(&slots), ["i1", "i2", "A", "o1"]);
        assert_eq!(slots[0].kind, PageKind::Intro);
        assert_eq!(slots[2].kind, PageKind::Content);
        assert_eq!(slots[3].kind, PageKind::Outro);
    }

    #[test]
    fn blank_content_page_keeps_its_number() {
        let input = LayoutInput {
            first_page_side: PageSide::Left,
            content_pages: vec![page("A", 1), PageSlot::content(None, 2), page("C", 3)],
            ..Default::default()
        };

        let layout = build_spreads(&input);
        assert_eq!(layout.spreads[0].right.page_number, Some(2));
        assert!(layout.spreads[0].right.is_blank());
        assert_eq!(codes(&layout.scroll_list), ["A", "C"]);
    }

    #[test]
    fn empty_book_without_cover_has_no_spreads() {
        let left = LayoutInput {
            first_page_side: PageSide::Left,
            ..Default::default()
        };
        assert!(build_spreads(&left).spreads.is_empty());

        // A right start still needs the facing blank to be completed.
        let right = LayoutInput::default();
        assert_eq!(spread_codes(&build_spreads(&right)), [pair("_", "_")]);
    }

    #[test]
    fn empty_book_with_cover_is_cover_only() {
        let input = LayoutInput {
            first_page_side: PageSide::Right,
            covers: full_covers(),
            ..Default::default()
        };

        assert_eq!(
            spread_codes(&build_spreads(&input)),
            [pair("x", "F"), pair("f", "b"), pair("B", "x")]
        );
        assert_eq!(
            codes(&arrange_pages(&input)),
            ["x", "F", "f", "b", "B", "x"]
        );
    }

    #[test]
    fn scroll_list_skips_fillers_but_keeps_covers() {
        let input = LayoutInput {
            first_page_side: PageSide::Left,
            content_pages: pages(&["A"]),
            covers: full_covers(),
            ..Default::default()
        };

        let layout = build_spreads(&input);
        assert_eq!(codes(&layout.scroll_list), ["F", "f", "A", "b", "B"]);
    }

    #[test]
    fn placement_ignores_page_numbers() {
        let numbered = LayoutInput {
            content_pages: vec![page("A", 7), page("B", 3)],
            ..Default::default()
        };
        let renumbered = LayoutInput {
            content_pages: vec![page("A", 1), page("B", 2)],
            ..Default::default()
        };

        assert_eq!(
            codes(&arrange_pages(&numbered)),
            codes(&arrange_pages(&renumbered))
        );
    }

    #[test]
    fn lookup_helpers_find_pages() {
        let input = LayoutInput {
            first_page_side: PageSide::Right,
            content_pages: vec![page("A", 1), PageSlot::content(None, 2), page("C", 3)],
            ..Default::default()
        };

        let layout = build_spreads(&input);
        assert_eq!(layout.spread_index_of_page(1), Some(0));
        assert_eq!(layout.spread_index_of_page(2), Some(1));
        assert_eq!(layout.spread_index_of_page(3), Some(1));
        assert_eq!(layout.spread_index_of_page(9), None);
        assert_eq!(layout.scroll_index_of_page(2), Some(1));
        assert_eq!(layout.page_count(), 4);
    }

    #[test]
    fn pairing_drops_dangling_slot_in_release() {
        if cfg!(debug_assertions) {
            return;
        }
        let spreads = pair_slots(vec![PageSlot::blank(), PageSlot::blank(), PageSlot::blank()]);
        assert_eq!(spreads.len(), 1);
    }

    #[test]
    fn page_side_parses_stored_values() {
        assert_eq!(PageSide::from_db("left"), PageSide::Left);
        assert_eq!(PageSide::from_db(" LEFT "), PageSide::Left);
        assert_eq!(PageSide::from_db("right"), PageSide::Right);
        assert_eq!(PageSide::from_db(""), PageSide::Right);
        assert_eq!(PageSide::Left.flipped(), PageSide::Right);
    }

    /// Every combination of cover faces, start side and small section sizes.
    fn all_inputs() -> Vec<LayoutInput> {
        let mut inputs = Vec::new();
        for mask in 0u8..16 {
            let face = |bit: u8, name: &str| (mask & bit != 0).then(|| name.to_string());
            let covers = CoverImages {
                front_outer: face(1, "F"),
                front_inner: face(2, "f"),
                back_inner: face(4, "b"),
                back_outer: face(8, "B"),
            };
            for side in [PageSide::Left, PageSide::Right] {
                for intros in 0..3 {
                    for contents in 0..5 {
                        for outros in 0..3 {
                            inputs.push(LayoutInput {
                                first_page_side: side,
                                intro_images: (0..intros).map(|i| format!("i{i}")).collect(),
                                content_pages: (0..contents)
                                    .map(|i| {
                                        let image = (i != 2).then(|| format!("c{i}"));
                                        PageSlot::content(image, i + 1)
                                    })
                                    .collect(),
                                outro_images: (0..outros).map(|i| format!("o{i}")).collect(),
                                covers: covers.clone(),
                            });
                        }
                    }
                }
            }
        }
        inputs
    }

    #[test]
    fn every_arrangement_is_even_and_fully_paired() {
        for input in all_inputs() {
            let slots = arrange_pages(&input);
            assert_eq!(slots.len() % 2, 0, "{input:?}");

            let layout = build_spreads(&input);
            assert_eq!(layout.spreads.len() * 2, slots.len(), "{input:?}");

            let flattened: Vec<PageSlot> = layout
                .spreads
                .iter()
                .flat_map(|s| [s.left.clone(), s.right.clone()])
                .collect();
            assert_eq!(flattened, slots);
        }
    }

    #[test]
    fn every_arrangement_preserves_content_order() {
        for input in all_inputs() {
            let placed: Vec<PageSlot> = build_spreads(&input)
                .spreads
                .iter()
                .flat_map(|s| [s.left.clone(), s.right.clone()])
                .filter(|slot| slot.page_number.is_some())
                .collect();
            assert_eq!(placed, input.content_pages, "{input:?}");
        }
    }

    #[test]
    fn every_arrangement_respects_cover_sides() {
        for input in all_inputs() {
            let layout = build_spreads(&input);
            if input.covers.any() {
                let first = layout.spreads.first().expect("cover book has spreads");
                let last = layout.spreads.last().expect("cover book has spreads");
                assert!(first.left.is_nothing(), "{input:?}");
                assert_eq!(first.right.kind, PageKind::Cover);
                assert!(last.right.is_nothing(), "{input:?}");
                assert_eq!(last.left.kind, PageKind::Cover);

                // Inner back cover always sits on a right-hand page.
                let back_inner = &layout.spreads[layout.spreads.len() - 2].right;
                assert_eq!(back_inner.kind, PageKind::Cover, "{input:?}");
            } else {
                assert!(layout
                    .spreads
                    .iter()
                    .all(|s| !s.left.is_nothing() && !s.right.is_nothing()));
            }

            let nothing_count = layout
                .spreads
                .iter()
                .flat_map(|s| [&s.left, &s.right])
                .filter(|slot| slot.is_nothing())
                .count();
            assert_eq!(nothing_count, if input.covers.any() { 2 } else { 0 });
        }
    }

    #[test]
    fn every_arrangement_starts_on_requested_side() {
        for input in all_inputs() {
            let slots = arrange_pages(&input);
            let first_real = slots
                .iter()
                .position(|slot| slot.kind == PageKind::Intro || slot.page_number.is_some());
            let Some(index) = first_real else { continue };
            let side = if index % 2 == 0 {
                PageSide::Left
            } else {
                PageSide::Right
            };
            assert_eq!(side, input.first_page_side, "{input:?}");
        }
    }

    #[test]
    fn scroll_list_never_holds_fillers() {
        for input in all_inputs() {
            let layout = build_spreads(&input);
            assert!(layout.scroll_list.iter().all(|s| !s.content.is_filler()));

            let arranged = arrange_pages(&input);
            let images: Vec<&str> = arranged
                .iter()
                .filter_map(|s| s.content.image())
                .collect();
            let scrolled: Vec<&str> = layout
                .scroll_list
                .iter()
                .filter_map(|s| s.content.image())
                .collect();
            assert_eq!(images, scrolled);
        }
    }

    #[test]
    fn layout_is_deterministic() {
        for input in all_inputs().into_iter().step_by(7) {
            assert_eq!(build_spreads(&input), build_spreads(&input));
        }
    }
}
