//! Rendered fragment: the unit of output a block hands to the compositor.
//!
//! Field names mirror the i3bar block record so a fragment serializes
//! straight into the host's wire format. Optional fields that are unset
//! are omitted, which the host reads as "inherit the bar default".

use crate::color::Color;
use serde::{Deserialize, Serialize};

/// Text alignment inside a block wider than its text (see `min_width`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// How the host should interpret `full_text`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Markup {
    #[default]
    None,
    Pango,
}

/// A single rendered block
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Fragment {
    /// Identity of the owning block. Stamped by the runtime, not the block.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub full_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_top: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_right: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_bottom: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_left: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub urgent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator_block_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<Markup>,
}

impl Fragment {
    pub fn new(full_text: impl Into<String>) -> Self {
        Self {
            full_text: full_text.into(),
            ..Default::default()
        }
    }

    /// Urgent fragment used when a block fails without its own fallback
    pub fn error(full_text: impl Into<String>) -> Self {
        Self {
            full_text: full_text.into(),
            urgent: true,
            ..Default::default()
        }
    }

    pub fn with_short_text(mut self, short_text: impl Into<String>) -> Self {
        self.short_text = Some(short_text.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<Option<Color>>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_background(mut self, background: impl Into<Option<Color>>) -> Self {
        self.background = background.into();
        self
    }

    pub fn with_urgent(mut self, urgent: bool) -> Self {
        self.urgent = urgent;
        self
    }

    /// Stamp the owning block's identity onto this fragment
    pub fn stamped(mut self, name: &str, instance: &str) -> Self {
        self.name = name.to_string();
        self.instance = Some(instance.to_string());
        self
    }

    /// Fill every unset field from the block's configured default state
    pub fn apply_style(&mut self, style: &BlockStyle) {
        self.color = self.color.or(style.color);
        self.background = self.background.or(style.background);
        self.border = self.border.or(style.border);
        self.border_top = self.border_top.or(style.border_top);
        self.border_right = self.border_right.or(style.border_right);
        self.border_bottom = self.border_bottom.or(style.border_bottom);
        self.border_left = self.border_left.or(style.border_left);
        self.min_width = self.min_width.or(style.min_width);
        self.align = self.align.or(style.align);
        self.urgent |= style.urgent;
        self.separator = self.separator.or(style.separator);
        self.separator_block_width = self.separator_block_width.or(style.separator_block_width);
        self.markup = self.markup.or(style.markup);
    }
}

/// Default state of a block, layered underneath every fragment it renders
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockStyle {
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub background: Option<Color>,
    #[serde(default)]
    pub border: Option<Color>,
    #[serde(default)]
    pub border_top: Option<u32>,
    #[serde(default)]
    pub border_right: Option<u32>,
    #[serde(default)]
    pub border_bottom: Option<u32>,
    #[serde(default)]
    pub border_left: Option<u32>,
    #[serde(default)]
    pub min_width: Option<u32>,
    #[serde(default)]
    pub align: Option<Align>,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub separator: Option<bool>,
    #[serde(default)]
    pub separator_block_width: Option<u32>,
    #[serde(default)]
    pub markup: Option<Markup>,
}
