//! Reader/writer for the classic tracker container.
//!
//! Fixed-offset layout, big-endian multi-byte fields:
//!
//! | offset | size | field |
//! |---|---|---|
//! | 0 | 20 | title, NUL-padded |
//! | 20 | 930 | 31 sample headers, 30 bytes each |
//! | 950 | 1 | song length |
//! | 951 | 1 | restart position |
//! | 952 | 128 | sequence table |
//! | 1080 | 4 | channel-count tag |
//! | 1084 | — | pattern data, then sample waveforms, then trailer |

use log::{debug, warn};
use rp_ir::{period, Cell, Module, Pattern, Sample, MAX_SEQUENCE, ROWS, SAMPLE_SLOTS};
use std::sync::Arc;

use crate::{EncodeError, FormatError};

const HEADER_LEN: usize = 1084;
const SAMPLE_HEADER_LEN: usize = 30;
const SEQUENCE_OFFSET: usize = 952;
const TAG_OFFSET: usize = 1080;
/// Declared sample lengths at or below this many bytes mean "no sample".
const MIN_SAMPLE_LEN: usize = 2;
/// Longest waveform the 16-bit word-count field can describe.
const MAX_SAMPLE_LEN: usize = 0xFFFF * 2;
/// Identifier appended after the last waveform on save.
const TRACKER_ID: &[u8; 8] = b"replayer";

/// Decode a byte buffer into a [`Module`].
pub fn load_module(data: &[u8]) -> Result<Module, FormatError> {
    if data.starts_with(b"Extended Module") {
        return Err(FormatError::ExtendedModule);
    }
    if data.len() < HEADER_LEN {
        return Err(FormatError::TooShort);
    }

    let num_channels = channels_from_tag(&data[TAG_OFFSET..TAG_OFFSET + 4])?;
    let mut module = Module::new("", num_channels);
    module = module.with_name(&read_string(&data[0..20]));

    // Sequence table: entries past the declared song length are ignored.
    let song_length = (data[950] as usize).clamp(1, MAX_SEQUENCE);
    let sequence: Vec<u8> =
        data[SEQUENCE_OFFSET..SEQUENCE_OFFSET + song_length].to_vec();
    let restart = data[951];
    if restart as usize >= song_length && restart != 0 {
        warn!("restart position {} past song length {}, using 0", restart, song_length);
    }
    module = module.with_sequence(sequence).with_restart_pos(restart);

    // The container has no pattern-count field; the highest sequence
    // entry defines how many patterns follow.
    let num_patterns = module.last_used_pattern() as usize + 1;
    let pattern_size = num_channels as usize * ROWS * 4;
    let patterns_end = HEADER_LEN + num_patterns * pattern_size;
    if patterns_end > data.len() {
        return Err(FormatError::Truncated("pattern data"));
    }
    debug!(
        "loading {} channels, {} patterns, {} positions",
        num_channels, num_patterns, song_length
    );
    for idx in 0..num_patterns {
        let offset = HEADER_LEN + idx * pattern_size;
        let pattern = read_pattern(&data[offset..offset + pattern_size], num_channels);
        module = module.with_pattern(idx as u8, pattern);
    }

    // Sample headers sit before the pattern data; waveforms follow it,
    // concatenated in slot order.
    let mut wave_offset = patterns_end;
    for slot in 1..SAMPLE_SLOTS as u8 {
        let base = SAMPLE_HEADER_LEN * slot as usize - 10;
        let (mut sample, declared_len) =
            read_sample_header(&data[base..base + SAMPLE_HEADER_LEN]);
        if declared_len <= MIN_SAMPLE_LEN {
            continue;
        }
        if wave_offset + declared_len > data.len() {
            return Err(FormatError::Truncated("sample data"));
        }
        sample.wave = Arc::new(
            data[wave_offset..wave_offset + declared_len]
                .iter()
                .map(|&b| b as i8)
                .collect(),
        );
        wave_offset += declared_len;

        // Loop bounds past the waveform are common in files in the wild.
        if sample.loop_end > declared_len as u32 {
            warn!("sample {} loop end {} clamped to {}", slot, sample.loop_end, declared_len);
            sample.loop_end = declared_len as u32;
            sample.loop_start = sample.loop_start.min(sample.loop_end);
        }
        module = module.with_sample(slot, Some(sample));
    }

    Ok(module)
}

/// Encode a [`Module`] into the container layout.
///
/// Patterns above the highest sequence entry are not written — the
/// container derives its pattern count from the sequence, so unreachable
/// patterns have nowhere to go. Documented limitation, not a defect.
pub fn save_module(module: &Module) -> Result<Vec<u8>, EncodeError> {
    // Computed in usize: a sequence entry of 255 is valid data and the
    // count must not wrap the index type.
    let num_patterns = module.last_used_pattern() as usize + 1;
    for idx in 0..num_patterns {
        let idx = idx as u8;
        let pattern = module
            .pattern(idx)
            .ok_or(EncodeError::MissingPattern(idx))?;
        if pattern.channels() != module.num_channels {
            return Err(EncodeError::ShapeMismatch(
                idx,
                pattern.channels(),
                module.num_channels,
            ));
        }
    }

    let mut out = Vec::new();
    write_padded(&mut out, module.name.as_bytes(), 20);

    for slot in 1..SAMPLE_SLOTS as u8 {
        write_sample_header(&mut out, module.sample(slot));
    }

    let song_length = module.sequence.len().min(MAX_SEQUENCE);
    out.push(song_length as u8);
    out.push(module.restart_pos);
    write_padded(&mut out, &module.sequence[..song_length], MAX_SEQUENCE);
    out.extend_from_slice(&channel_tag(module.num_channels));

    for idx in 0..num_patterns {
        // Checked above.
        let pattern = module.pattern(idx as u8).ok_or(EncodeError::MissingPattern(idx as u8))?;
        write_pattern(&mut out, pattern);
    }

    for slot in 1..SAMPLE_SLOTS as u8 {
        if let Some(sample) = module.sample(slot) {
            let len = even_len(sample.len());
            for &b in &sample.wave[..len] {
                out.push(b as u8);
            }
        }
    }

    out.extend_from_slice(TRACKER_ID);
    Ok(out)
}

// --- header pieces ---

/// Infer the channel count from the 4-byte tag.
///
/// Known tags map directly; anything else is digit-parsed, which keeps
/// compatibility with encoder variance in the wild (`6CHN`, `16CH`, ...).
fn channels_from_tag(tag: &[u8]) -> Result<u8, FormatError> {
    let raw: [u8; 4] = [tag[0], tag[1], tag[2], tag[3]];
    match &raw {
        b"M.K." | b"M!K!" | b"FLT4" => return Ok(4),
        _ => {}
    }
    let mut value: u32 = 0;
    let mut seen = false;
    for &b in &raw {
        if b.is_ascii_digit() {
            value = value * 10 + (b - b'0') as u32;
            seen = true;
        }
    }
    if !seen || value == 0 || value > 32 {
        return Err(FormatError::BadChannelTag(raw));
    }
    debug!("channel tag {:?} parsed as {} channels", raw, value);
    Ok(value as u8)
}

/// Canonical tag for a channel count (never round-trips the input tag).
fn channel_tag(num_channels: u8) -> [u8; 4] {
    match num_channels {
        4 => *b"M.K.",
        n if n < 10 => [b'0' + n, b'C', b'H', b'N'],
        n => [b'0' + n / 10, b'0' + n % 10, b'C', b'H'],
    }
}

fn read_string(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

fn write_padded(out: &mut Vec<u8>, bytes: &[u8], width: usize) {
    let n = bytes.len().min(width);
    out.extend_from_slice(&bytes[..n]);
    out.resize(out.len() + width - n, 0);
}

/// Parse one 30-byte sample header; returns the sample (without wave
/// data) and its declared waveform length in bytes.
fn read_sample_header(data: &[u8]) -> (Sample, usize) {
    let mut sample = Sample::new(&read_string(&data[0..22]));
    let declared_len = u16::from_be_bytes([data[22], data[23]]) as usize * 2;

    let finetune = (data[24] & 0x0F) as i8;
    sample.finetune = if finetune > 7 { finetune - 16 } else { finetune };
    sample.volume = data[25].min(rp_ir::MAX_VOLUME);

    let loop_start = u16::from_be_bytes([data[26], data[27]]) as u32 * 2;
    let loop_words = u16::from_be_bytes([data[28], data[29]]);
    // A stored repeat length of one word means "no loop".
    if loop_words > 1 {
        sample.loop_start = loop_start;
        sample.loop_end = loop_start + loop_words as u32 * 2;
    }

    (sample, declared_len)
}

fn write_sample_header(out: &mut Vec<u8>, sample: Option<&Arc<Sample>>) {
    let Some(sample) = sample else {
        out.resize(out.len() + SAMPLE_HEADER_LEN, 0);
        // Empty slots still carry the no-loop marker.
        let end = out.len();
        out[end - 1] = 1;
        return;
    };

    write_padded(out, sample.name.as_bytes(), 22);
    let len = even_len(sample.len());
    out.extend_from_slice(&((len / 2) as u16).to_be_bytes());
    out.push(sample.finetune as u8 & 0x0F);
    out.push(sample.volume.min(rp_ir::MAX_VOLUME));

    if sample.has_loop() {
        let loop_start = (sample.loop_start as usize & !1).min(len);
        let loop_len = even_len(sample.loop_end as usize - loop_start).min(len - loop_start);
        out.extend_from_slice(&((loop_start / 2) as u16).to_be_bytes());
        out.extend_from_slice(&((loop_len / 2) as u16).to_be_bytes());
    } else {
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
    }
}

fn even_len(len: usize) -> usize {
    len.min(MAX_SAMPLE_LEN) & !1
}

// --- pattern pieces ---

fn read_pattern(data: &[u8], num_channels: u8) -> Pattern {
    let mut pattern = Pattern::new(num_channels);
    for row in 0..ROWS {
        for ch in 0..num_channels {
            let offset = (row * num_channels as usize + ch as usize) * 4;
            *pattern.cell_mut(row, ch) = read_cell(&data[offset..offset + 4]);
        }
    }
    pattern
}

/// Unpack one 4-byte cell.
///
/// Byte 0: instrument high nibble | period bits 8..12.
/// Byte 1: period bits 0..8.
/// Byte 2: instrument low nibble | effect selector.
/// Byte 3: effect parameter (two nibbles).
fn read_cell(data: &[u8]) -> Cell {
    let period = ((data[0] as u16 & 0x0F) << 8) | data[1] as u16;
    let inst = (data[0] & 0xF0) | (data[2] >> 4);

    // Period 0 and periods the tables don't know both mean "no note";
    // pitch is data, not framing, so it never fails the load.
    let pitch = match period::pitch_for_period(period) {
        Some(p) => p as i8,
        None => -1,
    };

    Cell {
        pitch,
        inst,
        effect: data[2] & 0x0F,
        param0: data[3] >> 4,
        param1: data[3] & 0x0F,
    }
}

fn write_pattern(out: &mut Vec<u8>, pattern: &Pattern) {
    for row in 0..ROWS {
        for cell in pattern.row(row) {
            let period = if cell.pitch >= 0 {
                period::period(0, cell.pitch as u8)
            } else {
                0
            };
            out.push((cell.inst & 0xF0) | (period >> 8) as u8);
            out.push(period as u8);
            out.push(((cell.inst & 0x0F) << 4) | (cell.effect & 0x0F));
            out.push(cell.param_byte());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_map_to_four_channels() {
        assert_eq!(channels_from_tag(b"M.K."), Ok(4));
        assert_eq!(channels_from_tag(b"M!K!"), Ok(4));
        assert_eq!(channels_from_tag(b"FLT4"), Ok(4));
    }

    #[test]
    fn digit_tags_parse_decimal() {
        assert_eq!(channels_from_tag(b"6CHN"), Ok(6));
        assert_eq!(channels_from_tag(b"8CHN"), Ok(8));
        assert_eq!(channels_from_tag(b"16CH"), Ok(16));
        assert_eq!(channels_from_tag(b"32CH"), Ok(32));
    }

    #[test]
    fn digitless_or_huge_tags_are_rejected() {
        assert!(channels_from_tag(b"OCTA").is_err());
        assert!(channels_from_tag(b"99CH").is_err());
        assert!(channels_from_tag(b"0CHN").is_err());
    }

    #[test]
    fn canonical_tags() {
        assert_eq!(&channel_tag(4), b"M.K.");
        assert_eq!(&channel_tag(6), b"6CHN");
        assert_eq!(&channel_tag(8), b"8CHN");
        assert_eq!(&channel_tag(16), b"16CH");
    }

    #[test]
    fn cell_roundtrip_through_bytes() {
        let cell = Cell { pitch: 12, inst: 17, effect: 0xC, param0: 0x2, param1: 0x0 };
        let mut bytes = Vec::new();
        let mut pattern = Pattern::new(1);
        *pattern.cell_mut(0, 0) = cell;
        write_pattern(&mut bytes, &pattern);

        assert_eq!(read_cell(&bytes[0..4]), cell);
        // Instrument 17 splits across both nibble positions.
        assert_eq!(bytes[0] & 0xF0, 0x10);
        assert_eq!(bytes[2] >> 4, 0x01);
    }

    #[test]
    fn zero_period_decodes_to_no_note() {
        let cell = read_cell(&[0x00, 0x00, 0x00, 0x00]);
        assert_eq!(cell.pitch, -1);
    }

    #[test]
    fn unknown_period_decodes_to_no_note() {
        // Period 500 is in range but not in the finetune-0 table.
        let cell = read_cell(&[0x01, 0xF4, 0x00, 0x00]);
        assert_eq!(cell.pitch, -1);
    }

    #[test]
    fn short_buffer_is_too_short() {
        assert!(matches!(load_module(&[0u8; 100]), Err(FormatError::TooShort)));
    }

    #[test]
    fn extended_module_signature_is_distinguished() {
        let mut data = vec![0u8; 2000];
        data[..17].copy_from_slice(b"Extended Module: ");
        assert!(matches!(load_module(&data), Err(FormatError::ExtendedModule)));
    }

    #[test]
    fn truncated_pattern_block_errors() {
        // Valid header claiming one pattern, but no pattern bytes.
        let mut data = vec![0u8; HEADER_LEN];
        data[950] = 1;
        data[TAG_OFFSET..TAG_OFFSET + 4].copy_from_slice(b"M.K.");
        assert!(matches!(
            load_module(&data),
            Err(FormatError::Truncated("pattern data"))
        ));
    }

    #[test]
    fn no_loop_marker_is_repeat_length_one() {
        let mut out = Vec::new();
        let sample = Arc::new(Sample::new("x"));
        write_sample_header(&mut out, Some(&sample));
        assert_eq!(&out[28..30], &[0, 1]);
    }
}
