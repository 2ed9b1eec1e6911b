//! Visual and layout styling for nodes.
//!
//! [`Style`] and [`Border`] decide how a node paints. [`LayoutStyle`] is the
//! engine-neutral flexbox description the layout engine translates into its
//! own representation; it never references taffy types.

use weft_term::cell::Attr;
use weft_term::color::Rgb;

// ---------------------------------------------------------------------------
// Paint style
// ---------------------------------------------------------------------------

/// Colors and attributes. `None` colors mean the terminal default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub fg: Option<Rgb>,
    pub bg: Option<Rgb>,
    pub attrs: Attr,
}

impl Style {
    #[must_use]
    pub const fn fg(mut self, color: Rgb) -> Self {
        self.fg = Some(color);
        self
    }

    #[must_use]
    pub const fn bg(mut self, color: Rgb) -> Self {
        self.bg = Some(color);
        self
    }

    #[must_use]
    pub const fn attrs(mut self, attrs: Attr) -> Self {
        self.attrs = attrs;
        self
    }
}

/// How a text node breaks lines that exceed its width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// No wrapping; overlong lines are truncated with an ellipsis.
    None,
    /// Break at any grapheme boundary.
    Char,
    /// Break at spaces; a word wider than the line overflows.
    Word,
    /// Break at spaces, splitting words that cannot fit on any line.
    #[default]
    WordOrChar,
}

// ---------------------------------------------------------------------------
// Borders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    #[default]
    None,
    Single,
    Double,
    Round,
    Bold,
    Dashed,
}

/// Box-drawing glyphs for one border style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderChars {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
}

impl BorderStyle {
    /// The glyph set, or `None` for [`BorderStyle::None`].
    #[must_use]
    pub const fn chars(self) -> Option<BorderChars> {
        let (tl, tr, bl, br, h, v) = match self {
            Self::None => return None,
            Self::Single => ('┌', '┐', '└', '┘', '─', '│'),
            Self::Double => ('╔', '╗', '╚', '╝', '═', '║'),
            Self::Round => ('╭', '╮', '╰', '╯', '─', '│'),
            Self::Bold => ('┏', '┓', '┗', '┛', '━', '┃'),
            Self::Dashed => ('┌', '┐', '└', '┘', '╌', '╎'),
        };
        Some(BorderChars {
            top_left: tl,
            top_right: tr,
            bottom_left: bl,
            bottom_right: br,
            horizontal: h,
            vertical: v,
        })
    }

    #[inline]
    #[must_use]
    pub const fn is_visible(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Border style plus a base color and optional per-edge overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Border {
    pub style: BorderStyle,
    pub color: Option<Rgb>,
    pub top: Option<Rgb>,
    pub right: Option<Rgb>,
    pub bottom: Option<Rgb>,
    pub left: Option<Rgb>,
}

impl Border {
    #[must_use]
    pub const fn new(style: BorderStyle) -> Self {
        Self {
            style,
            color: None,
            top: None,
            right: None,
            bottom: None,
            left: None,
        }
    }

    #[must_use]
    pub const fn color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    /// Effective color of each edge: `[top, right, bottom, left]`.
    #[must_use]
    pub fn edge_colors(&self) -> [Option<Rgb>; 4] {
        [self.top, self.right, self.bottom, self.left].map(|edge| edge.or(self.color))
    }
}

// ---------------------------------------------------------------------------
// Layout style
// ---------------------------------------------------------------------------

/// A length in cells, a percentage of the parent (0–100), or automatic.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dimension {
    #[default]
    Auto,
    Cells(f32),
    Percent(f32),
}

impl Dimension {
    /// Numeric value, `Auto` counting as zero.
    #[must_use]
    pub const fn value(self) -> f32 {
        match self {
            Self::Auto => 0.0,
            Self::Cells(v) | Self::Percent(v) => v,
        }
    }
}

/// Per-side values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges<T> {
    pub top: T,
    pub right: T,
    pub bottom: T,
    pub left: T,
}

impl<T: Copy> Edges<T> {
    #[must_use]
    pub const fn all(v: T) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexDirection {
    #[default]
    Row,
    Column,
    RowReverse,
    ColumnReverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justify {
    #[default]
    Start,
    Center,
    End,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Stretch,
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Display {
    #[default]
    Flex,
    None,
}

/// Flexbox properties of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutStyle {
    pub display: Display,
    pub direction: FlexDirection,
    pub justify: Justify,
    pub align_items: Align,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub flex_basis: Dimension,
    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub min_height: Dimension,
    pub max_width: Dimension,
    pub max_height: Dimension,
    pub padding: Edges<Dimension>,
    pub margin: Edges<Dimension>,
    pub gap: Dimension,
    /// Border thickness in cells.
    pub border: Edges<f32>,
}

impl Default for LayoutStyle {
    fn default() -> Self {
        Self {
            display: Display::Flex,
            direction: FlexDirection::Row,
            justify: Justify::Start,
            align_items: Align::Stretch,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            flex_basis: Dimension::Auto,
            width: Dimension::Auto,
            height: Dimension::Auto,
            min_width: Dimension::Auto,
            min_height: Dimension::Auto,
            max_width: Dimension::Auto,
            max_height: Dimension::Auto,
            padding: Edges::all(Dimension::Cells(0.0)),
            margin: Edges::all(Dimension::Cells(0.0)),
            gap: Dimension::Cells(0.0),
            border: Edges::all(0.0),
        }
    }
}

/// A single settable layout property, for [`Dom::set_layout_property`].
///
/// [`Dom::set_layout_property`]: crate::tree::Dom::set_layout_property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutProperty {
    Width,
    Height,
    MinWidth,
    MinHeight,
    MaxWidth,
    MaxHeight,
    FlexGrow,
    FlexShrink,
    FlexBasis,
    Padding,
    PaddingTop,
    PaddingRight,
    PaddingBottom,
    PaddingLeft,
    Margin,
    MarginTop,
    MarginRight,
    MarginBottom,
    MarginLeft,
    Gap,
    Border,
    BorderTop,
    BorderRight,
    BorderBottom,
    BorderLeft,
}

impl LayoutProperty {
    /// Whether this property sets border thickness explicitly.
    #[must_use]
    pub const fn is_border(self) -> bool {
        matches!(
            self,
            Self::Border | Self::BorderTop | Self::BorderRight | Self::BorderBottom | Self::BorderLeft
        )
    }
}

impl LayoutStyle {
    /// Set one property. Numeric-only properties (grow, shrink, border)
    /// take the value of `Cells`/`Percent` and treat `Auto` as zero.
    pub fn set(&mut self, prop: LayoutProperty, value: Dimension) {
        use LayoutProperty as P;
        match prop {
            P::Width => self.width = value,
            P::Height => self.height = value,
            P::MinWidth => self.min_width = value,
            P::MinHeight => self.min_height = value,
            P::MaxWidth => self.max_width = value,
            P::MaxHeight => self.max_height = value,
            P::FlexGrow => self.flex_grow = value.value(),
            P::FlexShrink => self.flex_shrink = value.value(),
            P::FlexBasis => self.flex_basis = value,
            P::Padding => self.padding = Edges::all(value),
            P::PaddingTop => self.padding.top = value,
            P::PaddingRight => self.padding.right = value,
            P::PaddingBottom => self.padding.bottom = value,
            P::PaddingLeft => self.padding.left = value,
            P::Margin => self.margin = Edges::all(value),
            P::MarginTop => self.margin.top = value,
            P::MarginRight => self.margin.right = value,
            P::MarginBottom => self.margin.bottom = value,
            P::MarginLeft => self.margin.left = value,
            P::Gap => self.gap = value,
            P::Border => self.border = Edges::all(value.value()),
            P::BorderTop => self.border.top = value.value(),
            P::BorderRight => self.border.right = value.value(),
            P::BorderBottom => self.border.bottom = value.value(),
            P::BorderLeft => self.border.left = value.value(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
