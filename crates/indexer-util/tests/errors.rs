use indexer_util::errors::IndexerError;

#[test]
fn bad_request_display() {
    let err = IndexerError::BadRequest("invalid path".to_string());
    assert_eq!(err.to_string(), "bad request: invalid path");
}

#[test]
fn locked_display() {
    let err = IndexerError::Locked;
    assert_eq!(err.to_string(), "locked");
}

#[test]
fn io_error_permission_denied_maps_to_internal() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: IndexerError = io_err.into();
    assert!(matches!(err, IndexerError::InternalError(_)));
}

#[test]
fn io_error_not_found_maps_to_not_found() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let err: IndexerError = io_err.into();
    assert!(matches!(err, IndexerError::NotFound(_)));
}
