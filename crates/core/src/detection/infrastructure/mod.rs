pub mod recorded_face_detector;
