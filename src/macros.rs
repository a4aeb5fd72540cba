/// Declare a model struct together with its [`Model`](crate::Model) impl.
///
/// Every field gets a field-set constant (`1 << index`) and the struct gets
/// `FIELDS_ALL` and `COLUMNS`. Field types must implement
/// [`ScanTarget`](crate::ScanTarget), `Clone`, and convert into
/// [`RowValues`](crate::RowValues).
///
/// ```rust
/// use sql_model::prelude::*;
///
/// sql_model::model! {
///     #[derive(Debug, Default, Clone, PartialEq)]
///     pub struct User in "user" {
///         pub id: i64 => "id" as USER_ID,
///         pub name: String => "name" as USER_NAME,
///         pub age: i32 => "age" as USER_AGE,
///     }
/// }
///
/// assert_eq!(User::USER_AGE, 0b100);
/// assert_eq!(User::FIELDS_ALL, 0b111);
/// assert_eq!(User::default().columns(), &["id", "name", "age"]);
/// ```
///
/// Declaring more than [`MAX_NUMFIELDS`](crate::MAX_NUMFIELDS) fields fails
/// constant evaluation.
#[macro_export]
macro_rules! model {
    (@consts $idx:expr;) => {};
    (@consts $idx:expr; $konst:ident $($rest:ident)*) => {
        pub const $konst: $crate::FieldSet = $crate::field($idx);
        $crate::model!(@consts $idx + 1usize; $($rest)*);
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident in $table:literal {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty => $column:literal as $konst:ident
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field: $ty, )+
        }

        impl $name {
            $crate::model!(@consts 0usize; $($konst)+);

            pub const COLUMNS: &'static [&'static str] = &[$($column),+];
            pub const FIELDS_ALL: $crate::FieldSet = $crate::all_fields(Self::COLUMNS.len());
        }

        impl $crate::Model for $name {
            fn table(&self) -> &'static str {
                $table
            }

            fn columns(&self) -> &'static [&'static str] {
                Self::COLUMNS
            }

            fn vals(&self, fields: $crate::FieldSet, vals: &mut ::std::vec::Vec<$crate::RowValues>) {
                $(
                    if fields & Self::$konst != 0 {
                        vals.push($crate::RowValues::from(::std::clone::Clone::clone(&self.$field)));
                    }
                )+
            }

            fn ptrs<'a>(
                &'a mut self,
                fields: $crate::FieldSet,
                ptrs: &mut ::std::vec::Vec<&'a mut dyn $crate::ScanTarget>,
            ) {
                $(
                    if fields & Self::$konst != 0 {
                        ptrs.push(&mut self.$field);
                    }
                )+
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{Model, RowValues};

    crate::model! {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Account in "account" {
            id: i64 => "id" as ID,
            email: String => "email" as EMAIL,
            active: bool => "active" as ACTIVE,
            note: Option<String> => "note" as NOTE,
        }
    }

    #[test]
    fn generates_field_constants() {
        assert_eq!(Account::ID, 1);
        assert_eq!(Account::EMAIL, 2);
        assert_eq!(Account::ACTIVE, 4);
        assert_eq!(Account::NOTE, 8);
        assert_eq!(Account::FIELDS_ALL, 0b1111);
        assert_eq!(Account::default().table(), "account");
    }

    #[test]
    fn vals_follow_bit_order() {
        let account = Account {
            id: 3,
            email: "a@b".into(),
            active: true,
            note: None,
        };
        let mut vals = Vec::new();
        account.vals(Account::NOTE | Account::ID, &mut vals);
        assert_eq!(vals, vec![RowValues::Int(3), RowValues::Null]);
    }

    #[test]
    fn ptrs_fill_selected_fields() {
        let mut account = Account::default();
        {
            let mut ptrs = Vec::new();
            account.ptrs(Account::EMAIL | Account::ACTIVE, &mut ptrs);
            assert_eq!(ptrs.len(), 2);
            ptrs[0].set_value(RowValues::Text("x@y".into())).unwrap();
            ptrs[1].set_value(RowValues::Int(1)).unwrap();
        }
        assert_eq!(account.email, "x@y");
        assert!(account.active);
        assert_eq!(account.id, 0);
    }
}
