pub mod m202602100001_create_users;
pub mod m202602100002_create_courses;
pub mod m202602100003_create_user_course_roles;
pub mod m202602100004_create_attendance;
