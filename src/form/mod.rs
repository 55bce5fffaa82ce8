//! Raw-input handling: text sanitization, range policy, duration conversion
//! and the edit-buffer state machine backing live form fields.

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DurationUnit {
    Months,
    Years,
}

// Range policy applied before inputs reach the engine; the engine itself
// accepts any finite value.
pub fn clamp_return_pct(value: f64) -> f64 {
    value.clamp(-50.0, 50.0)
}

pub fn clamp_withdrawal_rate_pct(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

pub fn clamp_safety_margin_pct(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

// Currency-style input: commas and spaces are grouping noise, anything else
// non-numeric is dropped, an empty field means zero.
pub fn parse_amount(raw: &str) -> f64 {
    let stripped: String = raw.chars().filter(|c| *c != ',' && *c != ' ').collect();
    if stripped.is_empty() {
        return 0.0;
    }
    let sanitized: String = stripped
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    match sanitized.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

// Decimal-style input: a comma counts as a decimal point, only the first dot
// survives, an empty or unparseable field means zero.
pub fn parse_decimal(raw: &str) -> f64 {
    let sanitized = sanitize_decimal_text(raw);
    match sanitized.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

pub fn sanitize_decimal_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut seen_dot = false;
    for ch in raw.chars() {
        let ch = if ch == ',' { '.' } else { ch };
        if ch.is_ascii_digit() {
            out.push(ch);
        } else if ch == '.' && !seen_dot {
            seen_dot = true;
            out.push(ch);
        }
    }
    out
}

pub fn months_from_duration(value: f64, unit: DurationUnit) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    let value = value.max(0.0);
    let months = match unit {
        DurationUnit::Years => (value * 12.0).round(),
        DurationUnit::Months => value.round(),
    };
    months as u32
}

/// Two-field edit buffer for a live numeric form field: the raw typed text
/// and the last committed number are tracked separately, and external state
/// only overwrites the buffer when no edit is in progress.
#[derive(Debug, Clone)]
pub struct FieldEditor {
    text: String,
    committed: f64,
    editing: bool,
}

impl FieldEditor {
    pub fn new(initial: f64) -> Self {
        Self {
            text: display_text(initial),
            committed: initial,
            editing: false,
        }
    }

    pub fn focus(&mut self) {
        self.editing = true;
    }

    /// Accepts a keystroke-level buffer update. Intermediate states such as
    /// `"8."` are kept in the buffer; the committed value only moves when
    /// the buffer parses to a complete finite number.
    pub fn edit(&mut self, raw: &str) -> Option<f64> {
        self.editing = true;
        self.text = sanitize_decimal_text(raw);
        if self.text.is_empty() || self.text == "." {
            return None;
        }
        match self.text.parse::<f64>() {
            Ok(n) if n.is_finite() => {
                self.committed = n;
                Some(n)
            }
            _ => None,
        }
    }

    /// Ends the edit: the buffer is normalized into the committed value, or
    /// rolled back to it when the leftover text does not parse.
    pub fn blur(&mut self) -> f64 {
        self.editing = false;
        match self.text.parse::<f64>() {
            Ok(n) if n.is_finite() => {
                self.committed = n;
                self.text = display_text(n);
            }
            _ => {
                self.text = display_text(self.committed);
            }
        }
        self.committed
    }

    /// Applies an external value (e.g. a loaded snapshot) unless the user is
    /// mid-edit.
    pub fn sync(&mut self, external: f64) {
        if self.editing {
            return;
        }
        self.committed = external;
        self.text = display_text(external);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn committed(&self) -> f64 {
        self.committed
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }
}

fn display_text(value: f64) -> String {
    if value.is_finite() {
        format!("{value}")
    } else {
        String::new()
    }
}
