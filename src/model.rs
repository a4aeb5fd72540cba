use crate::fieldset::FieldSet;
use crate::types::{RowValues, ScanTarget};

/// A record type mapped onto one table.
///
/// Field `i` of the declaration owns bit `i` of every [`FieldSet`] passed in.
/// Implementations are usually generated by [`model!`](crate::model!).
pub trait Model {
    /// Table name.
    fn table(&self) -> &'static str;

    /// Column names in declaration order.
    fn columns(&self) -> &'static [&'static str];

    /// Push the values of the selected fields, lowest bit first.
    fn vals(&self, fields: FieldSet, vals: &mut Vec<RowValues>);

    /// Push scan targets for the selected fields, lowest bit first.
    fn ptrs<'a>(&'a mut self, fields: FieldSet, ptrs: &mut Vec<&'a mut dyn ScanTarget>);
}

/// Values of `fields` followed by `extra`.
#[must_use]
pub fn field_vals(model: &dyn Model, fields: FieldSet, extra: &[RowValues]) -> Vec<RowValues> {
    let mut vals = Vec::with_capacity(fields.count_ones() as usize + extra.len());
    model.vals(fields, &mut vals);
    vals.extend_from_slice(extra);
    vals
}

/// Values of `fields` followed by the values of `where_fields`, the parameter
/// order of an `UPDATE .. SET .. WHERE ..`.
#[must_use]
pub fn field_where_vals(model: &dyn Model, fields: FieldSet, where_fields: FieldSet) -> Vec<RowValues> {
    let mut vals = Vec::with_capacity((fields.count_ones() + where_fields.count_ones()) as usize);
    model.vals(fields, &mut vals);
    model.vals(where_fields, &mut vals);
    vals
}

/// Scan targets of `fields`.
pub fn field_ptrs<'a>(model: &'a mut dyn Model, fields: FieldSet) -> Vec<&'a mut dyn ScanTarget> {
    let mut ptrs = Vec::with_capacity(fields.count_ones() as usize);
    model.ptrs(fields, &mut ptrs);
    ptrs
}
