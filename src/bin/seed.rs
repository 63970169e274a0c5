use clap::Parser;
use fake::{
    faker::{
        internet::en::SafeEmail,
        lorem::en::{Paragraph, Sentence, Words},
        name::en::Name,
    },
    Fake,
};
use lectern::{
    auth::AuthService,
    config::DatabaseConfig,
    database::DatabaseManager,
    domain::{
        CourseLevel, CoursePurchase, CreateCourseRequest, NewUser, PurchaseStatus, Review,
        UserRole,
    },
    repository::{
        CourseRepository, PurchaseRepository, ReviewRepository, SqliteCourseRepository,
        SqlitePurchaseRepository, SqliteReviewRepository, SqliteUserRepository, UserRepository,
    },
};
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

const SEED_PASSWORD: &str = "password123";

#[derive(Parser, Debug)]
#[command(name = "seed", about = "Populate a Lectern database with sample data")]
struct Args {
    /// Database to seed. Created if missing.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://lectern.db")]
    database_url: String,

    /// Number of published courses to create
    #[arg(long, default_value_t = 5)]
    courses: usize,

    /// Number of student accounts to create
    #[arg(long, default_value_t = 10)]
    students: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("🌱 Starting database seeding...");

    let database = DatabaseManager::connect(&DatabaseConfig {
        url: args.database_url.clone(),
        max_connections: 5,
        connect_retries: 0,
        retry_interval_secs: 1,
        acquire_timeout_secs: 5,
    })
    .await?;

    println!("📋 Running migrations...");
    database.migrate().await?;

    let pool = database.pool().clone();
    let user_repo = SqliteUserRepository::new(pool.clone());
    let course_repo = SqliteCourseRepository::new(pool.clone());
    let purchase_repo = SqlitePurchaseRepository::new(pool.clone());
    let review_repo = SqliteReviewRepository::new(pool);

    let password_hash = AuthService::hash_password(SEED_PASSWORD).await?;

    println!("👥 Creating users...");

    user_repo.create(NewUser {
        name: "Admin User".to_string(),
        email: "admin@lectern.local".to_string(),
        password_hash: password_hash.clone(),
        role: UserRole::Admin,
    }).await?;

    let instructor = user_repo.create(NewUser {
        name: "Ira Instructor".to_string(),
        email: "instructor@lectern.local".to_string(),
        password_hash: password_hash.clone(),
        role: UserRole::Instructor,
    }).await?;

    let mut students = Vec::with_capacity(args.students);
    for i in 0..args.students {
        let name: String = Name().fake();
        let email: String = SafeEmail().fake();
        // Prefix keeps generated addresses unique across the run
        let student = user_repo.create(NewUser {
            name,
            email: format!("s{}.{}", i, email),
            password_hash: password_hash.clone(),
            role: UserRole::Student,
        }).await?;
        students.push(student);
    }

    println!("  ✅ Created admin, instructor and {} students", students.len());

    println!("📚 Creating courses...");

    let levels = [CourseLevel::Beginner, CourseLevel::Intermediate, CourseLevel::Advanced];
    let categories = ["programming", "design", "business", "music"];
    let mut courses = Vec::with_capacity(args.courses);

    for i in 0..args.courses {
        let title_words: Vec<String> = Words(2..5).fake();
        let subtitle: String = Sentence(4..8).fake();
        let description: String = Paragraph(2..4).fake();
        let (price, lectures) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(199..2999), rng.gen_range(5..40))
        };

        let request = CreateCourseRequest {
            title: title_words.join(" "),
            subtitle: Some(subtitle),
            description: Some(description),
            category: categories[i % categories.len()].to_string(),
            level: levels[i % levels.len()],
            price: Decimal::new(price, 0),
            thumbnail: format!("https://picsum.photos/seed/course{}/640/360", i),
            total_duration: lectures * 600,
            total_lectures: lectures,
        };

        let course = course_repo.create(request.into_course(instructor.id)).await?;
        let course = course_repo.set_published(course.id, true).await?;
        courses.push(course);
    }

    println!("  ✅ Created {} published courses", courses.len());

    println!("💳 Creating purchases and reviews...");

    let mut purchases = 0;
    let mut reviews = 0;
    for (i, student) in students.iter().enumerate() {
        let Some(course) = courses.get(i % courses.len().max(1)) else {
            break;
        };

        let mut purchase = CoursePurchase::pending(
            course.id,
            student.id,
            course.price,
            "INR",
            "razorpay",
        );
        purchase.gateway_order_id = format!("order_seed{:06}", i);
        purchase.gateway_payment_id = Some(format!("pay_seed{:06}", i));
        purchase.status = PurchaseStatus::Completed;
        purchase_repo.create(purchase).await?;
        user_repo.enroll(student.id, course.id).await?;
        purchases += 1;

        if i % 2 == 0 {
            let now = Utc::now();
            let comment: String = Sentence(6..12).fake();
            review_repo.create(Review {
                id: Uuid::new_v4(),
                course_id: course.id,
                user_id: student.id,
                rating: rand::thread_rng().gen_range(3..=5),
                comment: Some(comment),
                created_at: now,
                updated_at: now,
            }).await?;
            reviews += 1;
        }
    }

    println!("  ✅ Created {} purchases and {} reviews", purchases, reviews);

    database.close().await;

    println!("\n✨ Database seeding complete!");
    println!("\n📝 Test credentials:");
    println!("  Admin: admin@lectern.local / {}", SEED_PASSWORD);
    println!("  Instructor: instructor@lectern.local / {}", SEED_PASSWORD);
    println!("  Students share the password {}", SEED_PASSWORD);

    Ok(())
}
