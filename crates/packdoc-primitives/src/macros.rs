#[macro_export]
macro_rules! tag_registry_entries {
    ($macro:ident $(, @args $($args:tt)+ )?) => {
        $macro! {
            $(
                @args $($args)+;
            )?
            @entries
            (
                Short,
                0x0,
                label = "short",
                size_rule = Fixed(2),
                is_numeric = true,
                is_collection = false
            ),
            (
                Int,
                0x1,
                label = "int",
                size_rule = IntWidth,
                is_numeric = true,
                is_collection = false
            ),
            (
                Float,
                0x2,
                label = "float",
                size_rule = FloatWidth,
                is_numeric = true,
                is_collection = false
            ),
            (
                Special,
                0x3,
                label = "special",
                size_rule = Fixed(1),
                is_numeric = false,
                is_collection = false
            ),
            (
                String,
                0x4,
                label = "string",
                size_rule = LengthPrefixed,
                is_numeric = false,
                is_collection = false
            ),
            (
                Binary,
                0x5,
                label = "binary",
                size_rule = LengthPrefixed,
                is_numeric = false,
                is_collection = false
            ),
            (
                Array,
                0x6,
                label = "array",
                size_rule = Counted,
                is_numeric = false,
                is_collection = true
            ),
            (
                Dict,
                0x7,
                label = "dict",
                size_rule = Counted,
                is_numeric = false,
                is_collection = true
            ),
        }
    };
}

#[macro_export]
macro_rules! tag_registry {
    ($macro:ident) => {
        $crate::tag_registry_entries!($macro)
    };
    ($macro:ident, $($args:tt)+) => {
        $crate::tag_registry_entries!($macro, @args $($args)+)
    };
}

macro_rules! metadata_from_registry {
    ( @args $tag:expr; @entries $( ($variant:ident, $nibble:literal, label = $label:expr, size_rule = $rule:ident $(($width:expr))?, is_numeric = $is_numeric:expr, is_collection = $is_collection:expr) ),* $(,)? ) => {
        match $tag {
            $(
                $crate::Tag::$variant => $crate::TagMetadata {
                    label: $label,
                    size_rule: $crate::SizeRule::$rule $(($width))?,
                    is_numeric: $is_numeric,
                    is_collection: $is_collection,
                },
            )*
        }
    };
}

macro_rules! tag_from_nibble_registry {
    ( @args $nibble_value:expr; @entries $( ($variant:ident, $nibble:literal, label = $label:expr, size_rule = $rule:ident $(($width:expr))?, is_numeric = $is_numeric:expr, is_collection = $is_collection:expr) ),* $(,)? ) => {
        match $nibble_value {
            $( $nibble => Some($crate::Tag::$variant), )*
            _ => None,
        }
    };
}

macro_rules! all_tags_from_registry {
    ( @entries $( ($variant:ident, $nibble:literal, label = $label:expr, size_rule = $rule:ident $(($width:expr))?, is_numeric = $is_numeric:expr, is_collection = $is_collection:expr) ),* $(,)? ) => {
        [ $( $crate::Tag::$variant ),* ]
    };
}
