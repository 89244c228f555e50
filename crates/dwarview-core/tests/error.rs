//! Tests for error handling

use std::path::PathBuf;

use dwarview_core::error::{DwarviewError, Result};

#[test]
fn test_no_debug_info_display()
{
    let error = DwarviewError::NoDebugInfo(PathBuf::from("/bin/true"));
    assert_eq!(error.to_string(), "/bin/true: no DWARF information");
}

#[test]
fn test_object_parse_display()
{
    let error = DwarviewError::ObjectParse {
        path: PathBuf::from("notes.txt"),
        message: "Unknown file magic".to_string(),
    };
    let message = error.to_string();
    assert!(message.contains("notes.txt"));
    assert!(message.contains("Unknown file magic"));
}

#[test]
fn test_dwarf_display()
{
    let error = DwarviewError::Dwarf {
        context: "reading .debug_info unit header".to_string(),
        message: "unexpected end of input".to_string(),
    };
    assert_eq!(error.to_string(), "reading .debug_info unit header: unexpected end of input");
}

#[test]
fn test_search_errors_display()
{
    assert_eq!(DwarviewError::SearchBusy.to_string(), "A search is already in progress");
    assert!(DwarviewError::InvalidPattern("[abc".to_string())
        .to_string()
        .contains("[abc"));
}

#[test]
fn test_io_error_conversion()
{
    fn read() -> Result<Vec<u8>>
    {
        Ok(std::fs::read("/definitely/not/here")?)
    }

    match read() {
        Err(DwarviewError::Io(err)) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
        other => panic!("Expected Io error, got {other:?}"),
    }
}

#[test]
fn test_result_type_alias()
{
    fn ok() -> Result<u32>
    {
        Ok(7)
    }

    fn fail() -> Result<u32>
    {
        Err(DwarviewError::InvalidArgument("offset".to_string()))
    }

    assert_eq!(ok().unwrap(), 7);
    assert!(fail().unwrap_err().to_string().contains("offset"));
}
