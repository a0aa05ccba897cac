//! Spanish rendering of `Timing.repeat` dosing frequencies.

use crate::datatypes::TimingRepeat;

/// Singular and plural Spanish nouns for a UCUM time unit code.
fn unit_nouns(code: &str) -> Option<(&'static str, &'static str)> {
    match code {
        "s" => Some(("segundo", "segundos")),
        "min" => Some(("minuto", "minutos")),
        "h" => Some(("hora", "horas")),
        "d" => Some(("día", "días")),
        "wk" => Some(("semana", "semanas")),
        "mo" => Some(("mes", "meses")),
        "a" => Some(("año", "años")),
        _ => None,
    }
}

/// Format a `Timing.repeat` as a Spanish frequency sentence.
///
/// - `frequency == 1`, `period == 1`: `"Una vez por día"`
/// - `frequency > 1`, `period == 1`: `"3 veces por día"`
/// - `period != 1`: `"2 veces cada 3 días"`
///
/// Unrecognised unit codes are emitted verbatim, with an `s` appended for the plural.
/// Returns `None` when `frequency`, `period` or `periodUnit` is missing.
pub fn format_frequency(repeat: &TimingRepeat) -> Option<String> {
    let frequency = repeat.frequency?;
    let period = repeat.period?;
    let unit = repeat.period_unit.as_deref()?;

    let (singular, plural) = match unit_nouns(unit) {
        Some((singular, plural)) => (singular.to_owned(), plural.to_owned()),
        None => (unit.to_owned(), format!("{unit}s")),
    };

    let sentence = if period == 1.0 {
        if frequency == 1 {
            format!("Una vez por {singular}")
        } else {
            format!("{frequency} veces por {singular}")
        }
    } else {
        format!("{frequency} veces cada {period} {plural}")
    };

    Some(sentence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repeat(frequency: Option<u32>, period: Option<f64>, unit: Option<&str>) -> TimingRepeat {
        TimingRepeat {
            frequency,
            period,
            period_unit: unit.map(Into::into),
        }
    }

    #[test]
    fn once_per_unit() {
        assert_eq!(
            format_frequency(&repeat(Some(1), Some(1.0), Some("d"))).as_deref(),
            Some("Una vez por día")
        );
        assert_eq!(
            format_frequency(&repeat(Some(1), Some(1.0), Some("wk"))).as_deref(),
            Some("Una vez por semana")
        );
    }

    #[test]
    fn several_times_per_unit() {
        assert_eq!(
            format_frequency(&repeat(Some(3), Some(1.0), Some("d"))).as_deref(),
            Some("3 veces por día")
        );
    }

    #[test]
    fn several_times_every_n_units() {
        assert_eq!(
            format_frequency(&repeat(Some(2), Some(3.0), Some("d"))).as_deref(),
            Some("2 veces cada 3 días")
        );
        assert_eq!(
            format_frequency(&repeat(Some(1), Some(6.0), Some("mo"))).as_deref(),
            Some("1 veces cada 6 meses")
        );
        assert_eq!(
            format_frequency(&repeat(Some(1), Some(0.5), Some("h"))).as_deref(),
            Some("1 veces cada 0.5 horas")
        );
    }

    #[test]
    fn unknown_unit_passes_through() {
        assert_eq!(
            format_frequency(&repeat(Some(2), Some(1.0), Some("fortnight"))).as_deref(),
            Some("2 veces por fortnight")
        );
        assert_eq!(
            format_frequency(&repeat(Some(2), Some(3.0), Some("fortnight"))).as_deref(),
            Some("2 veces cada 3 fortnights")
        );
    }

    #[test]
    fn missing_parts_yield_none() {
        assert_eq!(format_frequency(&repeat(None, Some(1.0), Some("d"))), None);
        assert_eq!(format_frequency(&repeat(Some(1), None, Some("d"))), None);
        assert_eq!(format_frequency(&repeat(Some(1), Some(1.0), None)), None);
    }
}
