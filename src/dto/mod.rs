pub mod enrollment_dto;
pub mod exam_dto;
