//! Segmentation of an ndiff text report into per-host diff blocks.
//!
//! The report is read line by line. Each line is classified on its own
//! (`classify`), then fed to a `BlockAccumulator` holding the current host
//! and the changed lines seen for it so far. A blank line or the end of the
//! report closes the block. Neither step touches the store.
//!
//! ```text
//! host1.example (10.0.0.1):     <- header, current host = 10.0.0.1
//! +80/tcp open  http            <- changed line, appended
//!                               <- blank, block for 10.0.0.1 emitted
//! ```

/// Report boilerplate that never belongs to a host's diff.
const NOISE_PREFIXES: [&str; 5] = ["+Nmap", "-Nmap", "+Not shown", "-Not shown", " PORT"];

/// Classification of one report line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// Summary, "not shown" and column header lines.
    Noise,
    /// Empty or whitespace-only; ends the current block.
    Blank,
    /// Added (`+`) or removed (`-`) line, marker included.
    Changed(&'a str),
    /// Names the host of the lines that follow.
    Header(&'a str),
}

/// The changed lines reported for one host address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffBlock {
    pub address: String,
    /// Changed lines, each terminated by `\n`.
    pub text: String,
}

/// Classify a single report line (without its line terminator).
pub fn classify(line: &str) -> Line<'_> {
    if NOISE_PREFIXES.iter().any(|p| line.starts_with(p)) {
        Line::Noise
    } else if line.trim().is_empty() {
        Line::Blank
    } else if line.starts_with('+') || line.starts_with('-') {
        Line::Changed(line)
    } else {
        Line::Header(header_address(line))
    }
}

/// Host address named by a header line.
///
/// A single token is the address itself (`10.0.0.1:`). With several tokens
/// the second one is used, which matches the `name (address):` form.
fn header_address(line: &str) -> &str {
    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(only), None) => only.trim_matches(':'),
        (Some(_), Some(second)) => second.trim_matches(|c: char| matches!(c, '(' | ')' | ':')),
        (None, _) => "",
    }
}

/// Accumulates changed lines for the current host.
#[derive(Debug, Default)]
pub struct BlockAccumulator {
    current_host: String,
    current_block: String,
}

impl BlockAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one classified line. Returns a block when the line closes one.
    pub fn step(&mut self, line: Line<'_>) -> Option<DiffBlock> {
        match line {
            Line::Noise => None,
            Line::Blank => self.flush(),
            Line::Changed(text) => {
                self.current_block.push_str(text);
                self.current_block.push('\n');
                None
            }
            Line::Header(address) => {
                // A new header does not close the previous block.
                self.current_host = address.to_string();
                None
            }
        }
    }

    /// Close the report, emitting a trailing block with no blank line after it.
    pub fn finish(mut self) -> Option<DiffBlock> {
        self.flush()
    }

    fn flush(&mut self) -> Option<DiffBlock> {
        let address = std::mem::take(&mut self.current_host);
        let text = std::mem::take(&mut self.current_block);
        if address.is_empty() || text.is_empty() {
            return None;
        }
        Some(DiffBlock { address, text })
    }
}

/// Split a full ndiff report into per-host blocks, in report order.
pub fn split_blocks(report: &str) -> Vec<DiffBlock> {
    let mut acc = BlockAccumulator::new();
    let mut blocks: Vec<DiffBlock> = report
        .lines()
        .filter_map(|line| acc.step(classify(line)))
        .collect();
    blocks.extend(acc.finish());
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_HOSTS: &str = "host1.example (10.0.0.1):
+80/tcp open  http

host2.example (10.0.0.2):
-22/tcp open  ssh
+22/tcp closed ssh
";

    #[test]
    fn test_classify() {
        assert_eq!(classify("+Nmap 7.94 scan initiated"), Line::Noise);
        assert_eq!(classify("-Nmap 7.94 scan initiated"), Line::Noise);
        assert_eq!(classify("+Not shown: 998 closed ports"), Line::Noise);
        assert_eq!(classify("-Not shown: 999 closed ports"), Line::Noise);
        assert_eq!(classify(" PORT   STATE SERVICE"), Line::Noise);
        assert_eq!(classify(""), Line::Blank);
        assert_eq!(classify("   \t"), Line::Blank);
        assert_eq!(classify("+80/tcp open  http"), Line::Changed("+80/tcp open  http"));
        assert_eq!(classify("-22/tcp open  ssh"), Line::Changed("-22/tcp open  ssh"));
        assert_eq!(classify("host1.example (10.0.0.1):"), Line::Header("10.0.0.1"));
        assert_eq!(classify("10.0.0.7:"), Line::Header("10.0.0.7"));
        assert_eq!(classify(" 10.0.0.8:"), Line::Header("10.0.0.8"));
    }

    #[test]
    fn test_two_hosts() {
        let blocks = split_blocks(TWO_HOSTS);
        assert_eq!(
            blocks,
            vec![
                DiffBlock {
                    address: "10.0.0.1".to_string(),
                    text: "+80/tcp open  http\n".to_string(),
                },
                DiffBlock {
                    address: "10.0.0.2".to_string(),
                    text: "-22/tcp open  ssh\n+22/tcp closed ssh\n".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_trailing_block_without_blank_line() {
        let blocks = split_blocks("10.0.0.3:\n+443/tcp open  https");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].address, "10.0.0.3");
        assert_eq!(blocks[0].text, "+443/tcp open  https\n");
    }

    #[test]
    fn test_noise_never_flushes_or_leaks() {
        let report = "-Nmap 7.94 scan initiated Mon Feb 23 as: nmap -sT 10.0.0.0/24
+Nmap 7.94 scan initiated Tue Feb 24 as: nmap -sT 10.0.0.0/24

 web.local (10.0.0.1):
-Not shown: 999 closed ports
+Not shown: 998 closed ports
 PORT   STATE SERVICE
+80/tcp open  http
";
        let blocks = split_blocks(report);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].address, "10.0.0.1");
        assert_eq!(blocks[0].text, "+80/tcp open  http\n");
    }

    #[test]
    fn test_noise_between_changes_keeps_one_block() {
        let mut acc = BlockAccumulator::new();
        assert_eq!(acc.step(classify("10.0.0.1:")), None);
        assert_eq!(acc.step(classify("+22/tcp open ssh")), None);
        assert_eq!(acc.step(classify(" PORT   STATE SERVICE")), None);
        assert_eq!(acc.step(classify("+25/tcp open smtp")), None);
        let block = acc.finish().unwrap();
        assert_eq!(block.text, "+22/tcp open ssh\n+25/tcp open smtp\n");
    }

    #[test]
    fn test_header_without_changes_emits_nothing() {
        assert!(split_blocks("10.0.0.1:\n\n10.0.0.2:\n").is_empty());
    }

    #[test]
    fn test_changes_without_header_are_dropped() {
        assert!(split_blocks("+80/tcp open http\n\n").is_empty());
    }

    #[test]
    fn test_new_header_replaces_host_without_flush() {
        let blocks = split_blocks("10.0.0.1:\n+80/tcp open http\n10.0.0.2:\n+22/tcp open ssh\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].address, "10.0.0.2");
        assert_eq!(blocks[0].text, "+80/tcp open http\n+22/tcp open ssh\n");
    }

    #[test]
    fn test_blank_line_resets_state() {
        let mut acc = BlockAccumulator::new();
        acc.step(Line::Header("10.0.0.1"));
        acc.step(Line::Changed("+80/tcp open http"));
        assert!(acc.step(Line::Blank).is_some());
        assert!(acc.step(Line::Blank).is_none());
        acc.step(Line::Changed("+22/tcp open ssh"));
        assert!(acc.finish().is_none());
    }

    #[test]
    fn test_crlf_report() {
        let blocks = split_blocks("10.0.0.1:\r\n+80/tcp open http\r\n\r\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "+80/tcp open http\n");
    }
}
