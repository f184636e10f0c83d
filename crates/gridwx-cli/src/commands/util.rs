use anyhow::{bail, Context, Result};
use rayon::ThreadPoolBuilder;

pub fn configure_threads(spec: &str) {
    let count = if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        spec.parse().unwrap_or_else(|_| num_cpus::get())
    };
    let _ = ThreadPoolBuilder::new().num_threads(count).build_global();
}

/// `"2021,2023-2024"` -> `[2021, 2023, 2024]`, sorted and deduplicated.
pub fn parse_years(spec: &str) -> Result<Vec<i32>> {
    let mut years = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match part.split_once('-') {
            Some((from, to)) => {
                let from: i32 = from
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid year range '{part}'"))?;
                let to: i32 = to
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid year range '{part}'"))?;
                if from > to {
                    bail!("year range '{part}' runs backwards");
                }
                years.extend(from..=to);
            }
            None => years.push(
                part.parse()
                    .with_context(|| format!("invalid year '{part}'"))?,
            ),
        }
    }
    if years.is_empty() {
        bail!("no years given");
    }
    years.sort_unstable();
    years.dedup();
    Ok(years)
}
