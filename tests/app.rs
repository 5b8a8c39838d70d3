use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use chrono::NaiveDate;

use penn_canvas::app::{App, RunOptions};
use penn_canvas::canvas::{
    Assignment, CanvasClient, CommunicationChannel, Course, CourseUpdate, DiscussionEntry,
    DiscussionTopic, Enrollment, EnrollmentRole, ExternalToolTag, Group, GroupCategory, Tab, User,
};
use penn_canvas::config::{Credentials, OrientationSettings, ResolvedConfig, StorageSettings};
use penn_canvas::domain::{CanvasId, Instance, ShoppingAction, Tool, UserRef};
use penn_canvas::error::CanvasError;
use penn_canvas::fs_util::validate_zip;
use penn_canvas::output::JsonOutput;
use penn_canvas::pipeline::ALREADY_PROCESSED;
use penn_canvas::store::Store;

fn id(value: u64) -> CanvasId {
    CanvasId::new(value)
}

fn not_found() -> CanvasError {
    CanvasError::CanvasStatus {
        status: 404,
        message: "The specified resource does not exist.".to_string(),
    }
}

fn course(course_id: u64, sis: &str, public: bool, quota: u64) -> Course {
    Course {
        id: id(course_id),
        name: Some(format!("Course {course_id}")),
        course_code: None,
        sis_course_id: Some(sis.to_string()),
        account_id: None,
        storage_quota_mb: Some(quota),
        is_public_to_auth_users: Some(public),
        workflow_state: Some("available".to_string()),
    }
}

fn channel(channel_id: u64, address: &str, state: &str) -> CommunicationChannel {
    CommunicationChannel {
        id: id(channel_id),
        address: address.to_string(),
        channel_type: "email".to_string(),
        workflow_state: state.to_string(),
    }
}

fn tab(tab_id: &str, label: &str, hidden: bool) -> Tab {
    Tab {
        id: tab_id.to_string(),
        label: label.to_string(),
        hidden,
        tab_type: Some("external".to_string()),
    }
}

#[derive(Default)]
struct MockCanvas {
    courses: Mutex<HashMap<u64, Course>>,
    broken_courses: Vec<u64>,
    channels: HashMap<u64, Vec<CommunicationChannel>>,
    deleted_channels: Mutex<Vec<u64>>,
    created_channels: Mutex<Vec<String>>,
    tabs: HashMap<u64, Vec<Tab>>,
    assignments: HashMap<u64, Vec<Assignment>>,
    topics: HashMap<u64, Vec<DiscussionTopic>>,
    announcements: HashMap<u64, Vec<DiscussionTopic>>,
    entries: HashMap<u64, Vec<DiscussionEntry>>,
    users: HashMap<String, User>,
    enrollments: Mutex<Vec<(u64, u64)>>,
    categories: Vec<GroupCategory>,
    groups: Mutex<Vec<Group>>,
    memberships: Mutex<Vec<(u64, u64)>>,
}

impl MockCanvas {
    fn check_course(&self, course_id: CanvasId) -> Result<(), CanvasError> {
        if self.broken_courses.contains(&course_id.get()) {
            return Err(CanvasError::CanvasStatus {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        if !self.courses.lock().unwrap().contains_key(&course_id.get()) {
            return Err(not_found());
        }
        Ok(())
    }
}

impl CanvasClient for MockCanvas {
    fn get_user(&self, user: &UserRef) -> Result<User, CanvasError> {
        match user {
            UserRef::SisUserId(penn_id) => self.users.get(penn_id).cloned().ok_or_else(not_found),
            _ => Err(not_found()),
        }
    }

    fn list_communication_channels(
        &self,
        user_id: CanvasId,
    ) -> Result<Vec<CommunicationChannel>, CanvasError> {
        self.channels.get(&user_id.get()).cloned().ok_or_else(not_found)
    }

    fn create_email_channel(
        &self,
        _user_id: CanvasId,
        address: &str,
        skip_confirmation: bool,
    ) -> Result<CommunicationChannel, CanvasError> {
        assert!(skip_confirmation);
        self.created_channels.lock().unwrap().push(address.to_string());
        Ok(channel(900, address, "active"))
    }

    fn delete_communication_channel(
        &self,
        _user_id: CanvasId,
        channel_id: CanvasId,
    ) -> Result<(), CanvasError> {
        self.deleted_channels.lock().unwrap().push(channel_id.get());
        Ok(())
    }

    fn get_course(&self, course_id: CanvasId) -> Result<Course, CanvasError> {
        self.check_course(course_id)?;
        self.courses
            .lock()
            .unwrap()
            .get(&course_id.get())
            .cloned()
            .ok_or_else(not_found)
    }

    fn update_course(
        &self,
        course_id: CanvasId,
        update: &CourseUpdate,
    ) -> Result<Course, CanvasError> {
        let mut courses = self.courses.lock().unwrap();
        let course = courses.get_mut(&course_id.get()).ok_or_else(not_found)?;
        if let Some(public) = update.is_public_to_auth_users {
            course.is_public_to_auth_users = Some(public);
        }
        if let Some(quota) = update.storage_quota_mb {
            course.storage_quota_mb = Some(quota);
        }
        Ok(course.clone())
    }

    fn list_tabs(&self, course_id: CanvasId) -> Result<Vec<Tab>, CanvasError> {
        self.check_course(course_id)?;
        Ok(self.tabs.get(&course_id.get()).cloned().unwrap_or_default())
    }

    fn list_assignments(&self, course_id: CanvasId) -> Result<Vec<Assignment>, CanvasError> {
        self.check_course(course_id)?;
        Ok(self
            .assignments
            .get(&course_id.get())
            .cloned()
            .unwrap_or_default())
    }

    fn list_discussion_topics(
        &self,
        course_id: CanvasId,
        only_announcements: bool,
    ) -> Result<Vec<DiscussionTopic>, CanvasError> {
        self.check_course(course_id)?;
        let source = if only_announcements {
            &self.announcements
        } else {
            &self.topics
        };
        Ok(source.get(&course_id.get()).cloned().unwrap_or_default())
    }

    fn list_discussion_entries(
        &self,
        _course_id: CanvasId,
        topic_id: CanvasId,
    ) -> Result<Vec<DiscussionEntry>, CanvasError> {
        Ok(self.entries.get(&topic_id.get()).cloned().unwrap_or_default())
    }

    fn enroll_user(
        &self,
        course_id: CanvasId,
        user_id: CanvasId,
        role: EnrollmentRole,
    ) -> Result<Enrollment, CanvasError> {
        assert_eq!(role, EnrollmentRole::Student);
        self.enrollments
            .lock()
            .unwrap()
            .push((course_id.get(), user_id.get()));
        Ok(Enrollment {
            id: id(7000 + user_id.get()),
            user_id,
            course_id: Some(course_id),
            enrollment_state: Some("active".to_string()),
        })
    }

    fn list_group_categories(
        &self,
        _course_id: CanvasId,
    ) -> Result<Vec<GroupCategory>, CanvasError> {
        Ok(self.categories.clone())
    }

    fn list_groups(&self, _category_id: CanvasId) -> Result<Vec<Group>, CanvasError> {
        Ok(self.groups.lock().unwrap().clone())
    }

    fn create_group(&self, _category_id: CanvasId, name: &str) -> Result<Group, CanvasError> {
        let mut groups = self.groups.lock().unwrap();
        let group = Group {
            id: id(500 + groups.len() as u64),
            name: name.to_string(),
        };
        groups.push(group.clone());
        Ok(group)
    }

    fn create_group_membership(
        &self,
        group_id: CanvasId,
        user_id: CanvasId,
    ) -> Result<(), CanvasError> {
        self.memberships
            .lock()
            .unwrap()
            .push((group_id.get(), user_id.get()));
        Ok(())
    }
}

struct Fixture {
    _temp: tempfile::TempDir,
    root: Utf8PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        Self { _temp: temp, root }
    }

    fn store(&self) -> Store {
        Store::new_with_root(self.root.clone())
    }

    fn report(&self, name: &str, content: &str) {
        let dir = self.root.join("reports");
        fs::create_dir_all(dir.as_std_path()).unwrap();
        fs::write(dir.join(name).as_std_path(), content).unwrap();
    }

    fn app(&self, client: MockCanvas) -> App<MockCanvas> {
        App::new(self.store(), client, config())
    }

    fn results(&self, name: &str) -> Vec<Vec<String>> {
        let path = self.root.join("results").join(name);
        let mut reader = csv::Reader::from_path(path.as_std_path()).unwrap();
        reader
            .records()
            .map(|record| record.unwrap().iter().map(str::to_string).collect())
            .collect()
    }
}

fn config() -> ResolvedConfig {
    ResolvedConfig {
        schema_version: 1,
        data_dir: None,
        credentials: Credentials {
            instance: Instance::Test,
            url: "https://upenn.test.instructure.com".to_string(),
            token: "token".to_string(),
        },
        ignored_accounts: vec!["99243".to_string()],
        storage: StorageSettings {
            increment_mb: 1000,
            threshold: 0.79,
        },
        orientation: Some(OrientationSettings {
            course_id: id(4000),
            group_category: "Orientation Groups".to_string(),
        }),
    }
}

fn options() -> RunOptions {
    RunOptions {
        force: false,
        date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        input: None,
    }
}

const COURSES: &str = "canvas_course_id,course_id,short_name,account_id,term_id,status\n\
101,SRS_ANTH001401 2026C,ANTH 001,96678,2026C,active\n\
102,SRS_BIOL101001 2026C,BIOL 101,96678,2026C,active\n\
103,WH_SANDBOX,Sandbox,96678,2026C,active\n\
104,SRS_MATH104001 2026C,MATH 104,99243,2026C,active\n\
105,SRS_PHYS150001 2026C,PHYS 150,96678,2026C,deleted\n\
106,SRS_CHEM101001 2026C,CHEM 101,96678,2026C,active\n\
107,SRS_HIST001001 2026A,HIST 001,96678,2026A,active\n\
108,SRS_ECON001001 2026C,ECON 001,96678,2026C,active\n";

fn shopping_client() -> MockCanvas {
    let client = MockCanvas {
        broken_courses: vec![108],
        ..MockCanvas::default()
    };
    {
        let mut courses = client.courses.lock().unwrap();
        courses.insert(101, course(101, "SRS_ANTH001401 2026C", false, 1000));
        courses.insert(102, course(102, "SRS_BIOL101001 2026C", true, 1000));
        courses.insert(107, course(107, "SRS_HIST001001 2026A", false, 1000));
        courses.insert(108, course(108, "SRS_ECON001001 2026C", false, 1000));
    }
    client
}

#[test]
fn shopping_enable_reports_every_course() {
    let fixture = Fixture::new();
    fixture.report("courses_2026-10-18.csv", COURSES);
    let app = fixture.app(shopping_client());

    let result = app
        .shopping(ShoppingAction::Enable, Some("2026C"), &options(), &JsonOutput)
        .unwrap();

    assert_eq!(result.command, "shopping_enable");
    assert_eq!(result.loaded, 6);
    assert_eq!(result.filtered, 2);
    assert_eq!(result.summary.count("enabled"), 1);
    assert_eq!(result.summary.count("already enabled"), 1);
    assert_eq!(result.summary.count("not an SRS course"), 1);
    assert_eq!(result.summary.count("ignored account"), 1);
    assert_eq!(result.summary.count("course not found"), 1);
    assert_eq!(result.summary.count("failed to update"), 1);
    assert_eq!(result.summary.fatal, 1);
    assert_eq!(result.summary.recoverable, 1);

    let course = app.client().get_course(id(101)).unwrap();
    assert_eq!(course.is_public_to_auth_users, Some(true));

    let rows = fixture.results("courses_2026-10-18_shopping_enable_result.csv");
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0][4], "failed to update");
    assert_eq!(rows[1][4], "course not found");
}

#[test]
fn shopping_disable_leaves_hidden_courses_alone() {
    let fixture = Fixture::new();
    fixture.report("courses_2026-10-18.csv", COURSES);
    let app = fixture.app(shopping_client());

    let result = app
        .shopping(ShoppingAction::Disable, None, &options(), &JsonOutput)
        .unwrap();

    assert_eq!(result.summary.count("disabled"), 1);
    assert_eq!(result.summary.count("already disabled"), 2);
    let course = app.client().get_course(id(102)).unwrap();
    assert_eq!(course.is_public_to_auth_users, Some(false));
}

#[test]
fn email_activates_unconfirmed_channels() {
    let fixture = Fixture::new();
    fixture.report(
        "users_2026-10-18.csv",
        "canvas_user_id,login_id,full_name,email,status\n\
         1,alice,Alice Smith,alice@upenn.edu,active\n\
         2,bob,Bob Jones,bob@upenn.edu,active\n\
         3,carol,Carol King,carol@upenn.edu,deleted\n\
         4,dave,Dave Park,,active\n\
         5,erin,Erin Wu,erin@upenn.edu,active\n",
    );
    let mut channels = HashMap::new();
    channels.insert(1, vec![channel(11, "alice@upenn.edu", "unconfirmed")]);
    channels.insert(2, vec![channel(21, "bob@upenn.edu", "active")]);
    channels.insert(4, Vec::new());
    let app = fixture.app(MockCanvas {
        channels,
        ..MockCanvas::default()
    });

    let result = app.email(&options(), &JsonOutput).unwrap();

    assert_eq!(result.loaded, 4);
    assert_eq!(result.filtered, 1);
    assert_eq!(result.summary.count("activated"), 1);
    assert_eq!(result.summary.count("already active"), 1);
    assert_eq!(result.summary.count("no email"), 1);
    assert_eq!(result.summary.count("user not found"), 1);
    assert_eq!(*app.client().deleted_channels.lock().unwrap(), vec![11]);
    assert_eq!(
        *app.client().created_channels.lock().unwrap(),
        vec!["alice@upenn.edu".to_string()]
    );
}

#[test]
fn storage_raises_quota_past_threshold() {
    let fixture = Fixture::new();
    fixture.report(
        "storage_2026-10-18.csv",
        "id,sis id,short name,account id,Storage Used in MB\n\
         101,SRS_ANTH001401 2026C,ANTH 001,96678,812.4\n\
         102,SRS_BIOL101001 2026C,BIOL 101,96678,120.0\n\
         109,SRS_GONE001001 2026C,GONE 001,96678,900\n",
    );
    let client = MockCanvas::default();
    {
        let mut courses = client.courses.lock().unwrap();
        courses.insert(101, course(101, "SRS_ANTH001401 2026C", false, 1000));
        courses.insert(102, course(102, "SRS_BIOL101001 2026C", false, 1000));
    }
    let app = fixture.app(client);

    let result = app.storage(Some(500), &options(), &JsonOutput).unwrap();

    assert_eq!(result.summary.count("increased"), 1);
    assert_eq!(result.summary.count("not needed"), 1);
    assert_eq!(result.summary.count("course not found"), 1);
    let course = app.client().get_course(id(101)).unwrap();
    assert_eq!(course.storage_quota_mb, Some(1500));

    let rows = fixture.results("storage_2026-10-18_storage_result.csv");
    let increased = rows.iter().find(|row| row[4] == "increased").unwrap();
    assert_eq!(increased[5], "1000 -> 1500 MB");
}

fn orientation_client() -> MockCanvas {
    let mut users = HashMap::new();
    for (penn_id, user_id) in [("10000001", 1), ("10000002", 2), ("10000004", 4)] {
        users.insert(
            penn_id.to_string(),
            User {
                id: id(user_id),
                name: format!("Student {user_id}"),
                login_id: None,
                sis_user_id: Some(penn_id.to_string()),
            },
        );
    }
    MockCanvas {
        users,
        categories: vec![GroupCategory {
            id: id(77),
            name: "Orientation Groups".to_string(),
        }],
        groups: Mutex::new(vec![Group {
            id: id(301),
            name: "Red Team".to_string(),
        }]),
        ..MockCanvas::default()
    }
}

const ORIENTATION: &str = "Penn_ID,PennKey,Full_Name,Group\n\
10000001,astudent,A Student,Red Team\n\
10000002,bstudent,B Student,Blue Team\n\
10000003,cstudent,C Student,Red Team\n\
10000004,dstudent,D Student,\n";

#[test]
fn orientation_enrolls_and_creates_missing_groups() {
    let fixture = Fixture::new();
    fixture.report("orientation_2030.csv", ORIENTATION);
    let app = fixture.app(orientation_client());

    let result = app.orientation(2030, &options(), &JsonOutput).unwrap();

    assert_eq!(result.summary.count("enrolled"), 2);
    assert_eq!(result.summary.count("user not found"), 1);
    assert_eq!(result.summary.count("no group"), 1);
    let client = app.client();
    assert_eq!(*client.enrollments.lock().unwrap(), vec![(4000, 1), (4000, 2)]);
    let groups = client.groups.lock().unwrap();
    assert!(groups.iter().any(|group| group.name == "Blue Team"));
    assert_eq!(client.memberships.lock().unwrap()[0], (301, 1));
}

#[test]
fn orientation_rerun_skips_enrolled_students() {
    let fixture = Fixture::new();
    fixture.report("orientation_2030.csv", ORIENTATION);
    fixture.app(orientation_client())
        .orientation(2030, &options(), &JsonOutput)
        .unwrap();

    // A late admit is added at the top of the list.
    fixture.report(
        "orientation_2030.csv",
        "penn_id,pennkey,full_name,group\n\
         10000005,estudent,E Student,Red Team\n\
         10000002,bstudent,B Student,Blue Team\n\
         10000001,astudent,A Student,Red Team\n",
    );
    let mut client = orientation_client();
    client.users.insert(
        "10000005".to_string(),
        User {
            id: id(5),
            name: "Student 5".to_string(),
            login_id: None,
            sis_user_id: Some("10000005".to_string()),
        },
    );
    let app = fixture.app(client);
    let result = app.orientation(2030, &options(), &JsonOutput).unwrap();

    assert_eq!(result.batch.ledger_skipped, 2);
    assert_eq!(result.summary.count(ALREADY_PROCESSED), 2);
    assert_eq!(result.summary.count("enrolled"), 1);
    assert_eq!(*app.client().enrollments.lock().unwrap(), vec![(4000, 5)]);
    assert!(fixture.root.join("processed/orientation_2030.csv").as_std_path().is_file());
}

#[test]
fn orientation_requires_the_group_category() {
    let fixture = Fixture::new();
    fixture.report("orientation_2030.csv", ORIENTATION);
    let app = fixture.app(MockCanvas::default());

    let err = app.orientation(2030, &options(), &JsonOutput).unwrap_err();
    assert_matches!(err, CanvasError::GroupCategoryNotFound(ref name) if name == "Orientation Groups");
}

#[test]
fn tools_counts_visible_tabs_and_turnitin_assignments() {
    let fixture = Fixture::new();
    fixture.report("courses_2026-10-18.csv", COURSES);
    let client = shopping_client();
    let mut tabs = HashMap::new();
    tabs.insert(101, vec![tab("context_external_tool_5", "Zoom", false)]);
    tabs.insert(102, vec![tab("context_external_tool_5", "Zoom", true)]);
    let mut assignments = HashMap::new();
    assignments.insert(
        101,
        vec![Assignment {
            id: id(1),
            name: "Essay".to_string(),
            description: None,
            due_at: None,
            points_possible: Some(10.0),
            submission_types: vec!["external_tool".to_string()],
            external_tool_tag_attributes: Some(ExternalToolTag {
                url: Some("https://api.turnitin.com/api/lti/1p0/assignment".to_string()),
            }),
        }],
    );
    let app = fixture.app(MockCanvas {
        tabs,
        assignments,
        ..client
    });

    let zoom = app.tools(Tool::Zoom, &options(), &JsonOutput).unwrap();
    assert_eq!(zoom.command, "tools_zoom");
    assert_eq!(zoom.summary.count("used"), 1);
    assert_eq!(zoom.summary.count("not used"), 2);
    assert_eq!(zoom.summary.count("course not found"), 3);
    assert_eq!(zoom.summary.count("failed to check"), 1);

    let turnitin = app.tools(Tool::Turnitin, &options(), &JsonOutput).unwrap();
    assert_eq!(turnitin.summary.count("used"), 1);
    let rows = fixture.results("courses_2026-10-18_tools_turnitin_result.csv");
    let used = rows.iter().find(|row| row[4] == "used").unwrap();
    assert_eq!(used[5], "1 assignments");
}

#[test]
fn archive_writes_a_zip_per_course() {
    let fixture = Fixture::new();
    fixture.report(
        "courses_2026-10-18.csv",
        "canvas_course_id,course_id,short_name,account_id,term_id,status\n\
         101,SRS_ANTH001401 2026C,ANTH 001,96678,2026C,active\n\
         110,,Missing,96678,2026C,active\n",
    );
    let client = MockCanvas::default();
    client
        .courses
        .lock()
        .unwrap()
        .insert(101, course(101, "SRS_ANTH001401 2026C", false, 1000));
    let mut topics = HashMap::new();
    topics.insert(
        101,
        vec![DiscussionTopic {
            id: id(31),
            title: Some("Introductions".to_string()),
            message: Some("<p>Say hello</p>".to_string()),
            posted_at: Some("2026-09-01T12:00:00Z".to_string()),
            user_name: Some("Instructor".to_string()),
        }],
    );
    let mut entries = HashMap::new();
    entries.insert(
        31,
        vec![DiscussionEntry {
            id: id(41),
            user_id: Some(id(1)),
            user_name: Some("A Student".to_string()),
            message: Some("<p>Hi <b>all</b></p>".to_string()),
            created_at: Some("2026-09-02T08:00:00Z".to_string()),
        }],
    );
    let app = fixture.app(MockCanvas {
        topics,
        entries,
        ..client
    });

    let result = app.archive(&options(), &JsonOutput).unwrap();

    assert_eq!(result.summary.count("archived"), 1);
    assert_eq!(result.summary.count("course not found"), 1);
    let zip = fixture.root.join("archives").join("SRS_ANTH001401_2026C_101.zip");
    let names = validate_zip(&zip).unwrap();
    assert_eq!(
        names,
        vec!["discussions.csv", "announcements.csv", "assignments.csv"]
    );
    let rows = fixture.results("courses_2026-10-18_archive_result.csv");
    let archived = rows.iter().find(|row| row[4] == "archived").unwrap();
    assert_eq!(archived[5], "1 topics, 1 entries, 0 announcements, 0 assignments");
}

#[test]
fn archives_with_colliding_sis_ids_are_kept_apart() {
    let fixture = Fixture::new();
    fixture.report(
        "courses_2026-10-18.csv",
        "canvas_course_id,course_id,short_name,account_id,term_id,status\n\
         201,SRS_A/1,A 1,96678,2026C,active\n\
         202,SRS_A 1,A 1,96678,2026C,active\n",
    );
    let client = MockCanvas::default();
    {
        let mut courses = client.courses.lock().unwrap();
        courses.insert(201, course(201, "SRS_A/1", false, 1000));
        courses.insert(202, course(202, "SRS_A 1", false, 1000));
    }
    let app = fixture.app(client);

    let result = app.archive(&options(), &JsonOutput).unwrap();

    assert_eq!(result.summary.count("archived"), 2);
    let archives = fixture.root.join("archives");
    assert!(archives.join("SRS_A_1_201.zip").as_std_path().exists());
    assert!(archives.join("SRS_A_1_202.zip").as_std_path().exists());
    assert_eq!(fs::read_dir(archives.as_std_path()).unwrap().count(), 2);
}

#[test]
fn missing_report_is_a_setup_failure() {
    let fixture = Fixture::new();
    let app = fixture.app(MockCanvas::default());

    let err = app.email(&options(), &JsonOutput).unwrap_err();
    assert_matches!(
        err,
        CanvasError::ReportNotFound { ref pattern, .. } if pattern == "users_2026-10-18.csv"
    );
}

#[test]
fn explicit_input_bypasses_discovery() {
    let fixture = Fixture::new();
    let input = fixture.root.join("adhoc.csv");
    fs::write(
        input.as_std_path(),
        "canvas_user_id,login_id,full_name,email,status\n2,bob,Bob Jones,bob@upenn.edu,active\n",
    )
    .unwrap();
    let mut channels = HashMap::new();
    channels.insert(2, vec![channel(21, "bob@upenn.edu", "active")]);
    let app = fixture.app(MockCanvas {
        channels,
        ..MockCanvas::default()
    });

    let result = app
        .email(
            &RunOptions {
                input: Some(input),
                ..options()
            },
            &JsonOutput,
        )
        .unwrap();
    assert_eq!(result.summary.count("already active"), 1);
    assert!(fixture.root.join("results/adhoc_email_result.csv").as_std_path().is_file());
}
