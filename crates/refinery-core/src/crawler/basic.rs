//! Names for basic types.

use crate::error::{RefineryError, RefineryResult};
use crate::symbols::BaseTypeCode;

/// Name of the basic type with base type `code` and byte `length`.
///
/// Integers are named by width (`int32_t`, `uint8_t`, ...); every other
/// supported code has a fixed name whatever its length.
///
/// ## Errors
///
/// [`RefineryError::UnmappedBaseType`] for integer widths other than 1, 2, 4
/// or 8 bytes and for codes with no name.
pub fn base_type_name(code: BaseTypeCode, length: u64) -> RefineryResult<&'static str>
{
    let unmapped = || RefineryError::UnmappedBaseType { code, length };

    let name = match code {
        BaseTypeCode::NoType => "btNoType",
        BaseTypeCode::Void => "void",
        BaseTypeCode::Char => "char",
        BaseTypeCode::WChar => "wchar_t",
        BaseTypeCode::Int | BaseTypeCode::Long => match length {
            1 => "int8_t",
            2 => "int16_t",
            4 => "int32_t",
            8 => "int64_t",
            _ => return Err(unmapped()),
        },
        BaseTypeCode::UInt | BaseTypeCode::ULong => match length {
            1 => "uint8_t",
            2 => "uint16_t",
            4 => "uint32_t",
            8 => "uint64_t",
            _ => return Err(unmapped()),
        },
        BaseTypeCode::Float => "float",
        BaseTypeCode::Bcd => "BCD",
        BaseTypeCode::Bool => "bool",
        BaseTypeCode::Currency => "Currency",
        BaseTypeCode::Date => "Date",
        BaseTypeCode::Variant => "Variant",
        BaseTypeCode::Complex => "Complex",
        BaseTypeCode::Bit => "Bit",
        BaseTypeCode::Bstr => "BSTR",
        BaseTypeCode::Hresult => "HRESULT",
        BaseTypeCode::Char16 | BaseTypeCode::Char32 => return Err(unmapped()),
    };
    Ok(name)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_sized_integers()
    {
        assert_eq!(base_type_name(BaseTypeCode::Int, 1).unwrap(), "int8_t");
        assert_eq!(base_type_name(BaseTypeCode::Long, 4).unwrap(), "int32_t");
        assert_eq!(base_type_name(BaseTypeCode::Int, 8).unwrap(), "int64_t");
        assert_eq!(base_type_name(BaseTypeCode::UInt, 2).unwrap(), "uint16_t");
        assert_eq!(base_type_name(BaseTypeCode::ULong, 8).unwrap(), "uint64_t");
    }

    #[test]
    fn test_fixed_names_ignore_length()
    {
        assert_eq!(base_type_name(BaseTypeCode::Void, 0).unwrap(), "void");
        assert_eq!(base_type_name(BaseTypeCode::Float, 4).unwrap(), "float");
        assert_eq!(base_type_name(BaseTypeCode::Float, 8).unwrap(), "float");
        assert_eq!(base_type_name(BaseTypeCode::WChar, 2).unwrap(), "wchar_t");
        assert_eq!(base_type_name(BaseTypeCode::Hresult, 4).unwrap(), "HRESULT");
        assert_eq!(base_type_name(BaseTypeCode::NoType, 0).unwrap(), "btNoType");
    }

    #[test]
    fn test_unmapped_combinations()
    {
        assert!(matches!(
            base_type_name(BaseTypeCode::Int, 16),
            Err(RefineryError::UnmappedBaseType { length: 16, .. })
        ));
        assert!(base_type_name(BaseTypeCode::UInt, 3).is_err());
        assert!(base_type_name(BaseTypeCode::Char32, 4).is_err());
    }
}
