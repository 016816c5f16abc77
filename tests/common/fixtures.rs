use chrono::Utc;

use academy_backend::store::operations::courses::{Course, CourseLevel};
use academy_backend::store::operations::lessons::Lesson;
use academy_backend::store::operations::modules::CourseModule;
use academy_backend::store::operations::quizzes::{
    QuestionOption, QuestionType, Quiz, QuizQuestion,
};
use academy_backend::store::Store;

pub fn seed_course(store: &Store, instructor_id: &str, published: bool) -> Course {
    let now = Utc::now();
    let course = Course {
        id: uuid::Uuid::new_v4().to_string(),
        instructor_id: instructor_id.to_string(),
        title: "Vocal Foundations".to_string(),
        description: Some("Breath, posture, resonance".to_string()),
        level: CourseLevel::Beginner,
        thumbnail_url: None,
        is_published: published,
        created_at: now,
        updated_at: now,
    };
    store.create_course(&course).expect("seed course");
    course
}

pub fn seed_module(store: &Store, course_id: &str, order_index: u32) -> CourseModule {
    let module = CourseModule {
        id: uuid::Uuid::new_v4().to_string(),
        course_id: course_id.to_string(),
        title: format!("Module {order_index}"),
        description: None,
        order_index,
        created_at: Utc::now(),
    };
    store.create_module(&module).expect("seed module");
    module
}

pub fn seed_lesson(store: &Store, module_id: &str, watch_required: bool) -> Lesson {
    let now = Utc::now();
    let lesson = Lesson {
        id: uuid::Uuid::new_v4().to_string(),
        module_id: module_id.to_string(),
        title: "Diaphragmatic breathing".to_string(),
        description: None,
        video_url: "https://cdn.example.com/breathing.mp4".to_string(),
        duration_secs: Some(420),
        keywords: vec!["breath".to_string()],
        watch_required,
        order_index: 0,
        quiz_id: None,
        created_at: now,
        updated_at: now,
    };
    store.create_lesson(&lesson).expect("seed lesson");
    lesson
}

/// Attach a two-question quiz (1 point each, correct options `{qid}-a`) to a
/// lesson and return it.
pub fn attach_quiz(store: &Store, lesson: &Lesson, passing_score: u32) -> Quiz {
    let quiz = Quiz {
        id: uuid::Uuid::new_v4().to_string(),
        lesson_id: lesson.id.clone(),
        title: "Lesson quiz".to_string(),
        passing_score,
        questions: vec![two_option_question("q1"), two_option_question("q2")],
        created_at: Utc::now(),
    };
    store.create_quiz(&quiz).expect("seed quiz");

    let mut updated = lesson.clone();
    updated.quiz_id = Some(quiz.id.clone());
    store.update_lesson(&updated).expect("link quiz to lesson");

    quiz
}

fn two_option_question(id: &str) -> QuizQuestion {
    QuizQuestion {
        id: id.to_string(),
        text: format!("Question {id}"),
        question_type: QuestionType::MultipleChoice,
        points: 1,
        options: vec![
            QuestionOption {
                id: format!("{id}-a"),
                text: "Correct".to_string(),
                is_correct: true,
            },
            QuestionOption {
                id: format!("{id}-b"),
                text: "Wrong".to_string(),
                is_correct: false,
            },
        ],
    }
}
