use crate::fields::parse_number;
use crate::models::Grade;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Letter {
    A,
    B,
    C,
    D,
    F,
}

impl Letter {
    pub const fn points(self) -> f64 {
        match self {
            Letter::A => 4.0,
            Letter::B => 3.0,
            Letter::C => 2.0,
            Letter::D => 1.0,
            Letter::F => 0.0,
        }
    }

    pub fn from_percentage(value: f64) -> Letter {
        match value {
            v if v >= 90.0 => Letter::A,
            v if v >= 80.0 => Letter::B,
            v if v >= 70.0 => Letter::C,
            v if v >= 60.0 => Letter::D,
            _ => Letter::F,
        }
    }

    /// Parses `A`..`F` with an optional trailing `+`/`-`.
    ///
    /// The modifier is accepted but ignored: `B+` and `B-` both earn 3 points.
    pub fn parse(text: &str) -> Option<Letter> {
        let trimmed = text.trim();
        let base = trimmed
            .strip_suffix('+')
            .or_else(|| trimmed.strip_suffix('-'))
            .unwrap_or(trimmed);

        let mut chars = base.chars();
        let letter = match (chars.next(), chars.next()) {
            (Some(c), None) => c.to_ascii_uppercase(),
            _ => return None,
        };
        match letter {
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' | 'F' => Some(Letter::F),
            _ => None,
        }
    }
}

/// Grade points for a letter or percentage value; unreadable values earn 0.
pub fn grade_points(grade_value: &str) -> f64 {
    if let Some(letter) = Letter::parse(grade_value) {
        return letter.points();
    }
    parse_number(grade_value)
        .map(|pct| Letter::from_percentage(pct).points())
        .unwrap_or(0.0)
}

fn effective_credits(credits: f64) -> f64 {
    if credits.is_finite() && credits > 0.0 {
        credits
    } else {
        1.0
    }
}

/// Credit-weighted GPA on a 0–4 scale, rounded to two decimals.
pub fn compute_gpa(grades: &[Grade]) -> f64 {
    let (weighted, total_credits) = grades.iter().fold((0.0, 0.0), |(sum, credits), grade| {
        let weight = effective_credits(grade.credits);
        (sum + grade_points(&grade.grade_value) * weight, credits + weight)
    });

    if total_credits <= 0.0 {
        return 0.0;
    }
    (weighted / total_credits * 100.0).round() / 100.0
}
