use std::num::NonZeroU8;

use super::{descriptor, page_83, FakeDrive};
use crate::scsi::{
    executor::execute,
    pass_through::InquiryRequest,
    protocol::{DATA_OFFSET, STATUS_BUSY, STATUS_CHECK_CONDITION},
    read_device_identification,
    sense::{SenseTriple, ILLEGAL_REQUEST},
    DecodeError, Error, TransferError,
};

#[test]
fn test_execute_returns_data_region() {
    let page = page_83(&[&descriptor(1, 2, 8, b"SERIAL01")]);
    let mut drive = FakeDrive::answering(&page);
    let mut buffer = InquiryRequest::device_identification().build();

    let response = execute(&mut drive, &mut buffer).unwrap();

    assert_eq!(response.scsi_status, 0);
    assert_eq!(response.bytes_returned, DATA_OFFSET + page.len());
    assert_eq!(response.data, &page[..]);
    assert!(response.sense.is_empty());
    assert_eq!(drive.cdbs, vec![vec![0x12, 0x01, 0x83, 0, 0xff, 0]]);
}

#[test]
fn test_execute_truncates_to_allocation_length() {
    let page = page_83(&[&descriptor(1, 2, 8, b"A LONG SERIAL NUMBER")]);
    let mut drive = FakeDrive::answering(&page);
    let mut buffer = InquiryRequest::device_identification()
        .allocation_length(NonZeroU8::new(8).unwrap())
        .build();

    let response = execute(&mut drive, &mut buffer).unwrap();

    assert_eq!(response.data, &page[..8]);
}

#[test]
fn test_execute_os_error() {
    let mut drive = FakeDrive {
        os_error: Some(5),
        ..FakeDrive::default()
    };
    let mut buffer = InquiryRequest::device_identification().build();

    let err = execute(&mut drive, &mut buffer).unwrap_err();

    assert!(matches!(err, TransferError::Ioctl(_)));
    assert_eq!(err.os_error(), Some(5));
    // exactly one attempt
    assert_eq!(drive.cdbs.len(), 1);
}

#[test]
fn test_execute_short_response() {
    let mut drive = FakeDrive::answering(&[0x83, 0, 0]);
    let mut buffer = InquiryRequest::device_identification().build();

    let err = execute(&mut drive, &mut buffer).unwrap_err();

    assert!(matches!(err, TransferError::ShortResponse { returned: 3 }));
}

#[test]
fn test_execute_check_condition_with_sense() {
    let mut drive = FakeDrive {
        status: STATUS_CHECK_CONDITION,
        sense: vec![
            0x70, 0x0, ILLEGAL_REQUEST, 0, 0, 0, 0, 0xa, 0, 0, 0, 0, 0x24, 0x0, 0, 0, 0, 0,
        ],
        ..FakeDrive::default()
    };
    let mut buffer = InquiryRequest::device_identification()
        .sense_length(32)
        .build();

    let err = execute(&mut drive, &mut buffer).unwrap_err();

    match err {
        TransferError::BadStatus { status, sense } => {
            assert_eq!(status, STATUS_CHECK_CONDITION);
            assert_eq!(sense, Some(SenseTriple(ILLEGAL_REQUEST, 0x24, 0)));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_execute_check_condition_without_sense() {
    let mut drive = FakeDrive {
        status: STATUS_CHECK_CONDITION,
        ..FakeDrive::default()
    };
    let mut buffer = InquiryRequest::device_identification().build();

    let err = execute(&mut drive, &mut buffer).unwrap_err();

    assert!(matches!(
        err,
        TransferError::BadStatus { sense: None, .. }
    ));
    assert_eq!(err.to_string(), "device reported CHECK CONDITION (0x02)");
}

#[test]
fn test_execute_busy_is_not_decoded() {
    // a well-formed page must not leak through a non-GOOD status
    let page = page_83(&[&descriptor(1, 2, 8, b"SERIAL01")]);
    let mut drive = FakeDrive {
        status: STATUS_BUSY,
        ..FakeDrive::answering(&page)
    };
    let mut buffer = InquiryRequest::device_identification().build();

    let err = execute(&mut drive, &mut buffer).unwrap_err();

    assert!(matches!(
        err,
        TransferError::BadStatus {
            status: STATUS_BUSY,
            sense: None
        }
    ));
    assert_eq!(err.to_string(), "device reported BUSY (0x08)");
}

#[test]
fn test_execute_unnamed_status() {
    let mut drive = FakeDrive {
        status: 0x22,
        ..FakeDrive::answering(&page_83(&[]))
    };
    let mut buffer = InquiryRequest::device_identification().build();

    let err = execute(&mut drive, &mut buffer).unwrap_err();

    assert_eq!(err.to_string(), "device reported status 0x22");
}

#[test]
fn test_read_device_identification() {
    let page = page_83(&[
        &descriptor(2, 0, 3, &[0x50, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]),
        &descriptor(1, 2, 8, b"naa.5000c500a1b2c3d4 "),
        &descriptor(1, 1, 4, b"PORT-7"),
    ]);
    let mut drive = FakeDrive::answering(&page);

    let serials =
        read_device_identification(&mut drive, &InquiryRequest::device_identification()).unwrap();

    let values: Vec<_> = serials.iter().map(ToString::to_string).collect();
    assert_eq!(values, vec!["naa.5000c500a1b2c3d4", "PORT-7"]);
}

#[test]
fn test_read_device_identification_wrong_page() {
    let mut drive = FakeDrive::answering(&[0x80, 0, 0, 4, b'S', b'N', b'0', b'1']);

    let err = read_device_identification(&mut drive, &InquiryRequest::device_identification())
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Decode(DecodeError::UnexpectedPage(Some(0x80)))
    ));
    assert_eq!(
        err.to_string(),
        "expected VPD page 0x83, got page 0x80 (UnitSerialNumber)"
    );
}

#[test]
fn test_read_device_identification_transfer_error() {
    let mut drive = FakeDrive {
        os_error: Some(13),
        ..FakeDrive::default()
    };

    let err = read_device_identification(&mut drive, &InquiryRequest::device_identification())
        .unwrap_err();

    assert!(matches!(err, Error::Transfer(TransferError::Ioctl(_))));
}
