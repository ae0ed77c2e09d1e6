//! CRC-32 combination over disjoint byte ranges.
//!
//! Given `crc_a = CRC32(A)` and `crc_b = CRC32(B)`, the CRC of the
//! concatenation `A ++ B` can be derived without touching the data: appending
//! `n` zero bytes to a CRC is a linear operation over GF(2), so it can be
//! expressed as a 32×32 bit matrix and applied in O(log n) squarings. This is
//! the classic zlib `crc32_combine` construction, reproduced bit for bit.

/// Dimension of the GF(2) operator matrices (one row per CRC bit).
const GF2_DIM: usize = 32;

/// CRC-32 polynomial (reflected form), as used by zlib and `crc32fast`.
const POLY: u32 = 0xEDB8_8320;

/// Combine two CRC-32 values computed over adjacent byte ranges.
///
/// Returns `CRC32(A ++ B)` given `crc_a = CRC32(A)`, `crc_b = CRC32(B)` and
/// `len_b` = number of bytes in `B`. A non-positive `len_b` (empty `B`)
/// returns `crc_a` unchanged; negative lengths are deliberately treated the
/// same as zero, so callers must not rely on them being distinguishable.
pub fn combine(crc_a: u32, crc_b: u32, len_b: i64) -> u32 {
    // degenerate case, also covers negative lengths
    if len_b <= 0 {
        return crc_a;
    }

    let mut crc = crc_a;
    let mut len = len_b as u64;

    // operator for one zero bit
    let mut odd = [0u32; GF2_DIM];
    odd[0] = POLY;
    let mut row: u32 = 1;
    for entry in odd.iter_mut().skip(1) {
        *entry = row;
        row <<= 1;
    }

    // operator for two zero bits
    let mut even = [0u32; GF2_DIM];
    gf2_matrix_square(&mut even, &odd);

    // operator for four zero bits
    gf2_matrix_square(&mut odd, &even);

    // Apply len zero bytes to crc. The first squaring below turns the
    // four-zero-bit operator into the one-zero-byte (eight bit) operator,
    // then each loop iteration squares again for the next bit of len.
    loop {
        gf2_matrix_square(&mut even, &odd);
        if len & 1 != 0 {
            crc = gf2_matrix_times(&even, crc);
        }
        len >>= 1;
        if len == 0 {
            break;
        }

        // same again with the roles of odd and even swapped
        gf2_matrix_square(&mut odd, &even);
        if len & 1 != 0 {
            crc = gf2_matrix_times(&odd, crc);
        }
        len >>= 1;
        if len == 0 {
            break;
        }
    }

    crc ^ crc_b
}

/// GF(2) matrix times vector: XOR-fold the rows selected by set bits.
fn gf2_matrix_times(mat: &[u32; GF2_DIM], mut vec: u32) -> u32 {
    let mut sum = 0;
    let mut index = 0;
    while vec != 0 {
        if vec & 1 != 0 {
            sum ^= mat[index];
        }
        vec >>= 1;
        index += 1;
    }
    sum
}

/// GF(2) matrix squaring: `square = mat * mat`.
fn gf2_matrix_square(square: &mut [u32; GF2_DIM], mat: &[u32; GF2_DIM]) {
    for n in 0..GF2_DIM {
        square[n] = gf2_matrix_times(mat, mat[n]);
    }
}
