//! Field-set arithmetic.
//!
//! A field-set is a `u64` where bit `i` selects the i-th declared field of a
//! model. Statement cache keys pack an operation kind, a field-set and a
//! where-field-set into one integer:
//!
//! ```text
//!  63      60 59                     0
//! +----------+------------------------+
//! |   kind   | fields << n | where    |
//! +----------+------------------------+
//! ```
//!
//! `fields` and `where` are both below `2^n` and `n <= MAX_NUMFIELDS`, so the
//! low 60 bits never reach the kind nibble.

/// Bit-mask selecting a subset of a model's declared fields.
pub type FieldSet = u64;

/// Most fields a single model may declare.
pub const MAX_NUMFIELDS: usize = 30;

const KIND_SHIFT: u32 = 2 * MAX_NUMFIELDS as u32;

/// Operation kinds that own a disjoint range of cache identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SqlType {
    Insert = 1,
    Delete,
    Update,
    IncrBy,
    Limit,
    One,
    All,
    Count,
    Exists,
    /// Ad-hoc SQL looked up by registry id instead of field-sets.
    ById,
}

impl SqlType {
    /// The high-order bits this kind contributes to an identity.
    #[must_use]
    pub const fn bits(self) -> u64 {
        (self as u64) << KIND_SHIFT
    }
}

/// Number of fields selected by `fields`.
#[must_use]
pub const fn num_fields(fields: FieldSet) -> usize {
    fields.count_ones() as usize
}

/// The field-set containing only field `index`.
///
/// # Panics
/// When `index` is at or beyond [`MAX_NUMFIELDS`].
#[must_use]
pub const fn field(index: usize) -> FieldSet {
    assert!(index < MAX_NUMFIELDS, "field index exceeds MAX_NUMFIELDS");
    1 << index
}

/// The field-set selecting all of the first `n` fields, `2^n - 1`.
///
/// # Panics
/// When `n` exceeds [`MAX_NUMFIELDS`].
#[must_use]
pub const fn all_fields(n: usize) -> FieldSet {
    assert!(n <= MAX_NUMFIELDS, "field count exceeds MAX_NUMFIELDS");
    (1 << n) - 1
}

/// Combined cache identity of an operation over a table with `n` fields.
///
/// # Panics
/// When `n` exceeds the bit budget or either mask does not fit in `n` bits;
/// both would silently alias another statement otherwise.
#[must_use]
pub fn identity(kind: SqlType, n: usize, fields: FieldSet, where_fields: FieldSet) -> u64 {
    assert!(
        n <= MAX_NUMFIELDS,
        "table with {n} fields exceeds MAX_NUMFIELDS ({MAX_NUMFIELDS})"
    );
    let limit = all_fields(n);
    assert!(
        fields & !limit == 0 && where_fields & !limit == 0,
        "field-set {fields:#b}/{where_fields:#b} overflows a table with {n} fields"
    );
    kind.bits() | fields << n | where_fields
}

/// Iterate the indexes of the fields selected by `fields`, lowest first.
pub fn indexes(fields: FieldSet) -> impl Iterator<Item = usize> {
    let mut rest = fields;
    std::iter::from_fn(move || {
        if rest == 0 {
            return None;
        }
        let index = rest.trailing_zeros() as usize;
        rest &= rest - 1;
        Some(index)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn counts_fields() {
        assert_eq!(num_fields(0), 0);
        assert_eq!(num_fields(0b1011), 3);
        assert_eq!(num_fields(all_fields(MAX_NUMFIELDS)), MAX_NUMFIELDS);
    }

    #[test]
    fn all_fields_mask() {
        assert_eq!(all_fields(0), 0);
        assert_eq!(all_fields(3), 0b111);
    }

    #[test]
    fn identity_is_injective_for_one_kind() {
        let n = 4;
        let mut seen = HashSet::new();
        for fields in 0..=all_fields(n) {
            for where_fields in 0..=all_fields(n) {
                assert!(seen.insert(identity(SqlType::Update, n, fields, where_fields)));
            }
        }
    }

    #[test]
    fn kinds_never_collide() {
        let n = 3;
        let kinds = [
            SqlType::Insert,
            SqlType::Delete,
            SqlType::Update,
            SqlType::IncrBy,
            SqlType::Limit,
            SqlType::One,
            SqlType::All,
            SqlType::Count,
            SqlType::Exists,
        ];
        let mut seen = HashSet::new();
        for kind in kinds {
            for fields in 0..=all_fields(n) {
                for where_fields in 0..=all_fields(n) {
                    assert!(seen.insert(identity(kind, n, fields, where_fields)));
                }
            }
        }
    }

    #[test]
    fn max_width_identity_keeps_kind_bits() {
        let n = MAX_NUMFIELDS;
        let id = identity(SqlType::ById, n, all_fields(n), all_fields(n));
        assert_eq!(id >> KIND_SHIFT, SqlType::ById as u64);
    }

    #[test]
    #[should_panic(expected = "overflows")]
    fn identity_rejects_wide_masks() {
        let _ = identity(SqlType::All, 2, 0b100, 0);
    }

    #[test]
    fn iterates_indexes_in_order() {
        assert_eq!(indexes(0b1010_0001).collect::<Vec<_>>(), vec![0, 5, 7]);
        assert_eq!(indexes(0).count(), 0);
    }
}
