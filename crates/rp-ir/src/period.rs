//! Amiga period tables.
//!
//! Pitch is an index into a 36-entry chromatic range (three octaves,
//! C-1 to B-3 in Amiga notation). The tables below are the historical
//! ProTracker tuning tables, one row per finetune, stored verbatim —
//! the rounding is not reproducible from a formula.

/// Number of chromatic pitches the format can encode.
pub const PITCHES: usize = 36;

/// Number of finetune rows (-8..=7).
pub const FINETUNES: usize = 16;

/// Lowest period in the finetune-0 row (highest pitch).
pub const PERIOD_MIN: u16 = 113;

/// Highest period in the finetune-0 row (lowest pitch).
pub const PERIOD_MAX: u16 = 856;

/// Period tables in hardware nibble order: rows 0..=7 are finetune 0..7,
/// rows 8..=15 are finetune -8..-1.
static PERIODS: [[u16; PITCHES]; FINETUNES] = [
    // finetune 0
    [856, 808, 762, 720, 678, 640, 604, 570, 538, 508, 480, 453,
     428, 404, 381, 360, 339, 320, 302, 285, 269, 254, 240, 226,
     214, 202, 190, 180, 170, 160, 151, 143, 135, 127, 120, 113],
    // finetune +1
    [850, 802, 757, 715, 674, 637, 601, 567, 535, 505, 477, 450,
     425, 401, 379, 357, 337, 318, 300, 284, 268, 253, 239, 225,
     213, 201, 189, 179, 169, 159, 150, 142, 134, 126, 119, 113],
    // finetune +2
    [844, 796, 752, 709, 670, 632, 597, 563, 532, 502, 474, 447,
     422, 398, 376, 355, 335, 316, 298, 282, 266, 251, 237, 224,
     211, 199, 188, 177, 167, 158, 149, 141, 133, 125, 118, 112],
    // finetune +3
    [838, 791, 746, 704, 665, 628, 592, 559, 528, 498, 470, 444,
     419, 395, 373, 352, 332, 314, 296, 280, 264, 249, 235, 222,
     209, 198, 187, 176, 166, 157, 148, 140, 132, 125, 118, 111],
    // finetune +4
    [832, 785, 741, 699, 660, 623, 588, 555, 524, 495, 467, 441,
     416, 392, 370, 350, 330, 312, 294, 278, 262, 247, 233, 220,
     208, 196, 185, 175, 165, 156, 147, 139, 131, 124, 117, 110],
    // finetune +5
    [826, 779, 736, 694, 655, 619, 584, 551, 520, 491, 463, 437,
     413, 390, 368, 347, 328, 309, 292, 276, 260, 245, 232, 219,
     206, 195, 184, 174, 164, 155, 146, 138, 130, 123, 116, 109],
    // finetune +6
    [820, 774, 730, 689, 651, 614, 580, 547, 516, 487, 460, 434,
     410, 387, 365, 345, 325, 307, 290, 274, 258, 244, 230, 217,
     205, 193, 183, 172, 163, 153, 145, 137, 129, 122, 115, 109],
    // finetune +7
    [814, 768, 725, 684, 646, 610, 575, 543, 513, 484, 457, 431,
     407, 384, 363, 342, 323, 305, 288, 272, 256, 242, 228, 216,
     204, 192, 181, 171, 161, 152, 144, 136, 128, 120, 114, 108],
    // finetune -8
    [907, 856, 808, 762, 720, 678, 640, 604, 570, 538, 508, 480,
     453, 428, 404, 381, 360, 339, 320, 302, 285, 269, 254, 240,
     226, 214, 202, 190, 180, 170, 160, 151, 143, 135, 127, 120],
    // finetune -7
    [900, 850, 802, 757, 715, 675, 636, 601, 567, 535, 505, 477,
     450, 425, 401, 379, 357, 337, 318, 300, 284, 268, 253, 238,
     225, 212, 200, 189, 179, 169, 159, 150, 142, 134, 126, 119],
    // finetune -6
    [894, 844, 796, 752, 709, 670, 632, 597, 563, 532, 502, 474,
     447, 422, 398, 376, 355, 335, 316, 298, 282, 266, 251, 237,
     223, 211, 199, 188, 177, 167, 158, 149, 141, 133, 125, 118],
    // finetune -5
    [887, 838, 791, 746, 704, 665, 628, 592, 559, 528, 498, 470,
     444, 419, 395, 373, 352, 332, 314, 296, 280, 264, 249, 235,
     222, 209, 198, 187, 176, 166, 157, 148, 140, 132, 125, 118],
    // finetune -4
    [881, 832, 785, 741, 699, 660, 623, 588, 555, 524, 494, 467,
     441, 416, 392, 370, 350, 330, 312, 294, 278, 262, 247, 233,
     220, 208, 196, 185, 175, 165, 156, 147, 139, 131, 123, 117],
    // finetune -3
    [875, 826, 779, 736, 694, 655, 619, 584, 551, 520, 491, 463,
     437, 413, 390, 368, 347, 328, 309, 292, 276, 260, 245, 232,
     219, 206, 195, 184, 174, 164, 155, 146, 138, 130, 123, 116],
    // finetune -2
    [868, 820, 774, 730, 689, 651, 614, 580, 547, 516, 487, 460,
     434, 410, 387, 365, 345, 325, 307, 290, 274, 258, 244, 230,
     217, 204, 193, 183, 172, 163, 153, 145, 137, 129, 121, 115],
    // finetune -1
    [862, 814, 768, 725, 684, 646, 610, 575, 543, 513, 484, 457,
     431, 407, 384, 363, 342, 323, 305, 288, 272, 256, 242, 228,
     216, 203, 192, 181, 171, 161, 152, 143, 135, 128, 120, 114],
];

/// Row index for a finetune value (-8..=7), hardware nibble order.
fn finetune_row(finetune: i8) -> usize {
    let ft = finetune.clamp(-8, 7);
    if ft >= 0 { ft as usize } else { (ft + 16) as usize }
}

/// Look up the period for a pitch at a given finetune.
///
/// The (finetune, pitch) space is exhaustively covered by the tables;
/// an out-of-range pitch is an upstream invariant violation and clamps.
pub fn period(finetune: i8, pitch: u8) -> u16 {
    debug_assert!((pitch as usize) < PITCHES, "pitch {} out of range", pitch);
    let p = (pitch as usize).min(PITCHES - 1);
    PERIODS[finetune_row(finetune)][p]
}

/// Inverse lookup over the finetune-0 row (codec use only).
///
/// Exact matches only: period 0 and periods from other tunings or
/// non-standard encoders resolve to `None` ("no note").
pub fn pitch_for_period(period: u16) -> Option<u8> {
    PERIODS[0].iter().position(|&p| p == period).map(|i| i as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finetune_zero_anchors() {
        assert_eq!(period(0, 0), 856); // C-1
        assert_eq!(period(0, 12), 428); // C-2
        assert_eq!(period(0, 24), 214); // C-3
        assert_eq!(period(0, 35), 113); // B-3
    }

    #[test]
    fn finetune_rows_are_distinct() {
        assert_eq!(period(-8, 0), 907);
        assert_eq!(period(7, 0), 814);
        assert_eq!(period(1, 35), 113);
        assert_eq!(period(-1, 0), 862);
    }

    #[test]
    fn inverse_roundtrips_every_pitch() {
        for pitch in 0..PITCHES as u8 {
            assert_eq!(pitch_for_period(period(0, pitch)), Some(pitch));
        }
    }

    #[test]
    fn inverse_rejects_unknown_periods() {
        assert_eq!(pitch_for_period(0), None);
        assert_eq!(pitch_for_period(857), None);
        assert_eq!(pitch_for_period(1), None);
    }

    #[test]
    fn rows_are_monotonic_decreasing() {
        for ft in -8..=7 {
            for pitch in 1..PITCHES as u8 {
                assert!(period(ft, pitch) < period(ft, pitch - 1));
            }
        }
    }
}
