use std::fmt;

const UPPER_LEFT: char = '╔';
const UPPER_RIGHT: char = '╗';
const HORIZONTAL: char = '═';
const VERTICAL: char = '║';
const LOWER_LEFT: char = '╚';
const LOWER_RIGHT: char = '╝';

/// Columns a border adds on each side.
const BORDER_WIDTH: usize = 1;
/// Horizontal line drawn before the name.
const NAME_INDENT: usize = 1;
/// Columns two vertical borders add to every line.
pub(crate) const BOX_LINE_OVERHEAD: usize = 2 * BORDER_WIDTH;

/// A rendered block of text, optionally framed by a named border.
///
/// Framed boxes remember their name, footer and unframed body so they can be
/// renamed without re-parsing the border.
///
/// # Examples
/// ```
/// use bitwire_core::boxed::AsciiBoxWriter;
///
/// let rendered = AsciiBoxWriter.box_string("sampleField", "123123123123", 0);
/// assert_eq!(
///     rendered.to_string(),
///     "╔═sampleField╗\n║123123123123║\n╚════════════╝"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiBox {
    data: String,
    frame: Option<Frame>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    name: String,
    footer: String,
    body: String,
}

impl AsciiBox {
    /// An unframed box holding `data` verbatim.
    pub fn naked(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            frame: None,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.data.split('\n')
    }

    /// Widest line in characters.
    pub fn width(&self) -> usize {
        self.lines().map(char_count).max().unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.lines().count()
    }

    /// Name in the top border; empty for unframed boxes.
    pub fn name(&self) -> &str {
        self.frame.as_ref().map_or("", |frame| frame.name.as_str())
    }

    pub fn footer(&self) -> &str {
        self.frame.as_ref().map_or("", |frame| frame.footer.as_str())
    }

    /// A framed box is empty when its body is; an unframed one when it has
    /// no text at all.
    pub fn is_empty(&self) -> bool {
        match &self.frame {
            Some(frame) => frame.body.is_empty(),
            None => self.data.is_empty(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }
}

impl fmt::Display for AsciiBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data)
    }
}

fn char_count(line: &str) -> usize {
    line.chars().count()
}

fn spaces(count: usize) -> String {
    " ".repeat(count)
}

fn horizontal(count: usize) -> String {
    HORIZONTAL.to_string().repeat(count)
}

/// Stateless renderer for [`AsciiBox`]es using double-line box characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiBoxWriter;

impl AsciiBoxWriter {
    pub fn box_string(&self, name: &str, data: &str, char_width: usize) -> AsciiBox {
        self.box_string_with_footer(name, data, char_width, "")
    }

    /// Frame `data` under `name`, at least `char_width` columns wide. Lines
    /// narrower than the frame are centered.
    ///
    /// ```text
    /// ╔═name═════╗
    /// ║  data    ║
    /// ╚═══footer═╝
    /// ```
    pub fn box_string_with_footer(
        &self,
        name: &str,
        data: &str,
        char_width: usize,
        footer: &str,
    ) -> AsciiBox {
        let body = data.replace("\r\n", "\n").replace('\t', "  ");
        let name_length = char_count(name);
        let footer_text = if footer.is_empty() {
            String::new()
        } else {
            format!("{footer}{HORIZONTAL}")
        };
        let footer_length = char_count(&footer_text);

        let raw = AsciiBox::naked(body.as_str());
        let footer_add_on = if footer.is_empty() {
            0
        } else {
            footer_length + 2
        };
        let longest_line = raw.width().max(footer_add_on);
        let mut char_width = char_width;
        if char_width < longest_line {
            char_width = longest_line + 2 * BORDER_WIDTH;
        }

        let name_padding =
            char_width.saturating_sub(name_length + 2 * BORDER_WIDTH + NAME_INDENT);
        let mut rendered = String::new();
        rendered.push(UPPER_LEFT);
        rendered.push(HORIZONTAL);
        rendered.push_str(name);
        rendered.push_str(&horizontal(name_padding));
        rendered.push(UPPER_RIGHT);
        rendered.push('\n');

        let inner_width = NAME_INDENT + name_length + name_padding;
        for line in raw.lines() {
            let padding = inner_width.saturating_sub(char_count(line));
            let front = padding / 2;
            rendered.push(VERTICAL);
            rendered.push_str(&spaces(front));
            rendered.push_str(line);
            rendered.push_str(&spaces(padding - front));
            rendered.push(VERTICAL);
            rendered.push('\n');
        }

        rendered.push(LOWER_LEFT);
        rendered.push_str(&horizontal(inner_width.saturating_sub(footer_length)));
        rendered.push_str(&footer_text);
        rendered.push(LOWER_RIGHT);

        AsciiBox {
            data: rendered,
            frame: Some(Frame {
                name: name.to_string(),
                footer: footer.to_string(),
                body,
            }),
        }
    }

    /// Frame an already rendered box.
    pub fn box_box(&self, name: &str, inner: &AsciiBox, char_width: usize) -> AsciiBox {
        self.box_string(name, inner.as_str(), char_width)
    }

    pub fn box_box_with_footer(
        &self,
        name: &str,
        inner: &AsciiBox,
        char_width: usize,
        footer: &str,
    ) -> AsciiBox {
        self.box_string_with_footer(name, inner.as_str(), char_width, footer)
    }

    /// Re-render a framed box under a new name keeping body and footer. An
    /// unframed box gets framed.
    pub fn change_box_name(&self, source: &AsciiBox, name: &str) -> AsciiBox {
        let Some(frame) = &source.frame else {
            return self.box_string(name, source.as_str(), 0);
        };
        let body = AsciiBox::naked(frame.body.as_str());
        let minimum_width = (char_count(name) + NAME_INDENT + 2 * BORDER_WIDTH)
            .max(body.width() + BOX_LINE_OVERHEAD)
            .max(char_count(&frame.footer) + BOX_LINE_OVERHEAD);
        self.box_string_with_footer(name, &frame.body, minimum_width, &frame.footer)
    }

    /// Lay boxes out left to right, starting a new row whenever the next box
    /// would exceed `desired_width`. A box wider than `desired_width` widens
    /// the whole layout.
    pub fn align_boxes(&self, boxes: &[AsciiBox], desired_width: usize) -> AsciiBox {
        let widest = boxes.iter().map(AsciiBox::width).max().unwrap_or(0);
        if widest > desired_width {
            tracing::warn!(
                overflow = widest - desired_width,
                desired_width,
                "box exceeds the available width"
            );
        }
        let actual_width = desired_width.max(widest);

        let mut rows: Vec<AsciiBox> = Vec::new();
        let mut current_row: Vec<AsciiBox> = Vec::new();
        let mut current_row_length = 0;
        for item in boxes {
            current_row_length += item.width();
            if current_row_length > actual_width && !current_row.is_empty() {
                rows.push(self.merge_horizontal(&current_row));
                current_row.clear();
                current_row_length = item.width();
            }
            current_row.push(item.clone());
        }
        if !current_row.is_empty() {
            rows.push(self.merge_horizontal(&current_row));
        }

        rows.into_iter()
            .reduce(|above, below| self.box_below_box(&above, &below))
            .unwrap_or_else(|| AsciiBox::naked(""))
    }

    pub fn merge_horizontal(&self, boxes: &[AsciiBox]) -> AsciiBox {
        match boxes {
            [] => AsciiBox::naked(""),
            [single] => single.clone(),
            [first, rest @ ..] => self.box_side_by_side(first, &self.merge_horizontal(rest)),
        }
    }

    /// Place two boxes next to each other, padding the shorter one.
    pub fn box_side_by_side(&self, left: &AsciiBox, right: &AsciiBox) -> AsciiBox {
        let left_width = left.width();
        let right_width = right.width();
        let left_lines: Vec<&str> = left.lines().collect();
        let right_lines: Vec<&str> = right.lines().collect();
        let rows = left_lines.len().max(right_lines.len());

        let merged = (0..rows)
            .map(|row| {
                let mut line = String::new();
                for (lines, width) in [(&left_lines, left_width), (&right_lines, right_width)] {
                    let part = lines.get(row).copied().unwrap_or("");
                    line.push_str(part);
                    line.push_str(&spaces(width - char_count(part)));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n");
        AsciiBox::naked(merged)
    }

    /// Stack `lower` under `upper`, widening the narrower one.
    pub fn box_below_box(&self, upper: &AsciiBox, lower: &AsciiBox) -> AsciiBox {
        let width = upper.width().max(lower.width());
        let upper = self.expand_box(upper, width);
        let lower = self.expand_box(lower, width);
        AsciiBox::naked(format!("{upper}\n{lower}"))
    }

    /// Pad every line with spaces up to `desired_width`.
    pub fn expand_box(&self, source: &AsciiBox, desired_width: usize) -> AsciiBox {
        if source.width() >= desired_width {
            return source.clone();
        }
        let expanded = source
            .lines()
            .map(|line| format!("{line}{}", spaces(desired_width - char_count(line))))
            .collect::<Vec<_>>()
            .join("\n");
        AsciiBox::naked(expanded)
    }
}
