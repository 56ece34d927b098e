use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use speculate2::speculate;
use university_allocation::idgen::IdGenerator;
use university_allocation::ids::{is_valid_module_code, is_valid_staff_id, is_valid_student_id};
use university_allocation::models::*;
use university_allocation::*;

fn new_store() -> AllocationManager {
    AllocationManager::with_generator(IdGenerator::seeded(11))
}

/// Every structural invariant the store promises, checked from the outside.
fn assert_consistent(store: &AllocationManager) {
    let modules = store.modules();
    let students = store.students();
    let staff = store.staff();

    for student in &students {
        let id = student.id().expect("stored student has an ID");
        let mut same = 0u16;
        let mut lower = 0u16;
        for code in student.modules() {
            let module = modules
                .iter()
                .find(|m| m.code() == Some(code))
                .expect("enrolled module exists");
            assert!(module.students().contains(id), "enrolment is one-sided");
            if module.stage() == student.stage() {
                same += u16::from(module.credits());
            } else {
                lower += u16::from(module.credits());
            }
        }
        assert_eq!(u16::from(student.same_stage_credits()), same);
        assert_eq!(u16::from(student.lower_stage_credits()), lower);
        assert_eq!(u16::from(student.total_credits()), same + lower);
        assert!(student.total_credits() <= 120);
        assert!(student.lower_stage_credits() <= 30);
    }

    for module in &modules {
        let code = module.code().expect("stored module has a code");
        assert_eq!(module.enrolled() as usize, module.students().len());
        assert!(module.enrolled() <= module.capacity());
        if module.is_discontinued() {
            assert!(module.students().is_empty());
            assert!(module.teaching_staff().is_empty());
        }
        for student_id in module.students() {
            let student = students
                .iter()
                .find(|s| s.id() == Some(student_id))
                .expect("enrolled student exists");
            assert!(student.is_enrolled_on(code), "enrolment is one-sided");
        }
        for staff_id in module.teaching_staff() {
            let member = staff
                .iter()
                .find(|s| s.id() == Some(staff_id))
                .expect("teaching staff exists");
            assert!(member.teaches(code), "teaching link is one-sided");
        }
    }

    for member in &staff {
        let id = member.id().expect("stored staff has an ID");
        for code in member.teaching_modules() {
            let module = modules
                .iter()
                .find(|m| m.code() == Some(code))
                .expect("taught module exists");
            assert!(module.teaching_staff().contains(id));
        }
    }
}

speculate! {
    before {
        let mut store = new_store();
    }

    describe "students" {
        describe "add_student" {
            it "accepts every valid stage" {
                for stage in 1..=4 {
                    let id = store.add_student("Ada", "Lovelace", stage).expect("valid stage");
                    assert_eq!(store.student(id.as_str()).unwrap().stage().get(), stage);
                }
                assert_eq!(store.number_of_students(), 4);
            }

            it "rejects invalid stages without changing the store" {
                for stage in [0, 5, 200] {
                    let err = store.add_student("Ada", "Lovelace", stage).unwrap_err();
                    assert_eq!(err.kind(), "invalid_stage");
                }
                assert_eq!(store.number_of_students(), 0);
            }

            it "gives every student a unique ten digit ID" {
                let mut seen = HashSet::new();
                for i in 0..300 {
                    let id = store.add_student(format!("Student{i}"), "Test", 1).unwrap();
                    assert!(is_valid_student_id(id.as_str()), "{id}");
                    assert!(seen.insert(id));
                }
                assert_eq!(store.number_of_students(), 300);
            }

            it "lists exactly the added students, each resolvable" {
                let ids: Vec<StudentId> = (0..5)
                    .map(|i| store.add_student(format!("S{i}"), "Test", 2).unwrap())
                    .collect();

                let listed = store.students();
                assert_eq!(listed.len(), ids.len());
                for id in &ids {
                    assert!(listed.iter().any(|s| s.id() == Some(id)));
                    assert_eq!(store.student(id.as_str()).unwrap().id(), Some(id));
                }
            }

            it "lists students in ID order" {
                for i in 0..20 {
                    store.add_student(format!("S{i}"), "Test", 1).unwrap();
                }
                let ids: Vec<StudentId> = store
                    .students()
                    .iter()
                    .map(|s| s.id().unwrap().clone())
                    .collect();
                let mut sorted = ids.clone();
                sorted.sort();
                assert_eq!(ids, sorted);
            }
        }

        describe "add_existing_student" {
            it "assigns the ID to the caller's record too" {
                let mut student = Student::new("Grace", "Hopper", 3).unwrap();
                let id = store.add_existing_student(&mut student).unwrap();

                assert_eq!(student.id(), Some(&id));
                assert_eq!(store.student(id.as_str()).unwrap().forename(), "Grace");
            }

            it "refuses a record that already has an ID" {
                let mut student = Student::new("Grace", "Hopper", 3).unwrap();
                store.add_existing_student(&mut student).unwrap();

                let err = store.add_existing_student(&mut student).unwrap_err();
                assert_eq!(err.kind(), "id_already_set");
                assert_eq!(store.number_of_students(), 1);
            }
        }

        describe "student lookup" {
            it "rejects malformed IDs" {
                assert_eq!(store.student("12345").unwrap_err().kind(), "invalid_id");
                assert_eq!(store.student("abcdefghij").unwrap_err().kind(), "invalid_id");
            }

            it "reports unknown IDs" {
                assert_eq!(
                    store.student("0000000001").unwrap_err().kind(),
                    "id_not_recognised"
                );
            }
        }
    }

    describe "staff" {
        it "gives staff five digit lowercase hex IDs" {
            for i in 0..100 {
                let id = store.add_staff(format!("Staff{i}"), "Test").unwrap();
                assert!(is_valid_staff_id(id.as_str()));
                assert_eq!(id.as_str(), id.as_str().to_ascii_lowercase());
            }
            assert_eq!(store.number_of_staff(), 100);
        }

        it "finds staff whatever the case of the ID" {
            let id = store.add_staff("Alan", "Turing").unwrap();
            let upper = id.as_str().to_ascii_uppercase();
            assert_eq!(store.staff_member(&upper).unwrap().id(), Some(&id));
        }

        it "adds an existing staff record once" {
            let mut staff = Staff::new("Alan", "Turing");
            let id = store.add_existing_staff(&mut staff).unwrap();
            assert_eq!(staff.id(), Some(&id));
            assert_eq!(
                store.add_existing_staff(&mut staff).unwrap_err().kind(),
                "id_already_set"
            );
        }
    }

    describe "modules" {
        before {
            let lecturer_id = store.add_staff("Alan", "Turing").unwrap();
            let lecturer = store.staff_member(lecturer_id.as_str()).unwrap();
        }

        describe "add_module" {
            it "links every teaching staff member both ways" {
                let code = store.add_module("Compilers", 20, 2, 30, &[lecturer.clone()]).unwrap();

                assert!(is_valid_module_code(code.as_str()));
                let module = store.module(code.as_str()).unwrap();
                assert!(module.teaching_staff().contains(&lecturer_id));
                assert!(store.staff_member(lecturer_id.as_str()).unwrap().teaches(&code));
                assert_eq!(store.staff_of(code.as_str()).unwrap().len(), 1);
            }

            it "checks capacity before credits and stage" {
                let err = store.add_module("Broken", 200, 9, 0, &[]).unwrap_err();
                assert_eq!(err.kind(), "invalid_capacity");
            }

            it "rejects credits above 120" {
                let err = store.add_module("Broken", 121, 1, 10, &[]).unwrap_err();
                assert_eq!(err.kind(), "invalid_credits");
            }

            it "rejects an invalid stage" {
                let err = store.add_module("Broken", 20, 0, 10, &[]).unwrap_err();
                assert_eq!(err.kind(), "invalid_stage");
            }

            it "rejects duplicate staff" {
                let err = store
                    .add_module("Compilers", 20, 2, 30, &[lecturer.clone(), lecturer.clone()])
                    .unwrap_err();
                assert_eq!(err.kind(), "duplicate_staff");
                assert_eq!(store.number_of_modules(), 0);
            }

            it "rejects staff without an ID" {
                let stranger = Staff::new("No", "Id");
                let err = store
                    .add_module("Compilers", 20, 2, 30, &[lecturer.clone(), stranger])
                    .unwrap_err();
                assert_eq!(err.kind(), "id_not_set");
                assert!(store
                    .staff_member(lecturer_id.as_str())
                    .unwrap()
                    .teaching_modules()
                    .is_empty());
            }

            it "rejects staff who are not in the store" {
                let mut outsider = Staff::new("Out", "Sider");
                outsider.set_id(StaffId::parse("FFFFF").unwrap()).unwrap();
                let err = store
                    .add_module("Compilers", 20, 2, 30, &[outsider])
                    .unwrap_err();
                assert_eq!(err.kind(), "staff_not_in_system");
                assert_eq!(store.number_of_modules(), 0);
            }

            it "treats two unsaved records with the same name as unassigned, not duplicates" {
                let err = store
                    .add_module("Compilers", 20, 2, 30, &[Staff::new("Ann", "Smith"), Staff::new("Ann", "Smith")])
                    .unwrap_err();
                assert_eq!(err.kind(), "id_not_set");
                assert_eq!(store.number_of_modules(), 0);
            }

            it "accepts zero credits" {
                assert!(store.add_module("Seminar", 0, 1, 5, &[]).is_ok());
            }
        }

        describe "add_module_taught_by" {
            it "links staff given by ID" {
                let code = store
                    .add_module_taught_by("Compilers", 20, 2, 30, &[lecturer_id.clone()])
                    .unwrap();
                assert!(store.module(code.as_str()).unwrap().teaching_staff().contains(&lecturer_id));
                assert!(store.staff_member(lecturer_id.as_str()).unwrap().teaches(&code));
            }

            it "rejects an unknown staff ID as not in the system" {
                let unknown = StaffId::parse("fffff").unwrap();
                let err = store
                    .add_module_taught_by("Compilers", 20, 2, 30, &[lecturer_id.clone(), unknown])
                    .unwrap_err();
                assert_eq!(err.kind(), "staff_not_in_system");
                assert_eq!(store.number_of_modules(), 0);
                assert!(store
                    .staff_member(lecturer_id.as_str())
                    .unwrap()
                    .teaching_modules()
                    .is_empty());
            }

            it "checks capacity, then duplicates, then membership" {
                let unknown = StaffId::parse("fffff").unwrap();
                let err = store
                    .add_module_taught_by("Compilers", 20, 2, 0, &[unknown.clone(), unknown.clone()])
                    .unwrap_err();
                assert_eq!(err.kind(), "invalid_capacity");

                let err = store
                    .add_module_taught_by("Compilers", 20, 2, 30, &[unknown.clone(), unknown])
                    .unwrap_err();
                assert_eq!(err.kind(), "duplicate_staff");
            }
        }

        describe "add_existing_module" {
            it "assigns the code once" {
                let mut module = Module::new("Logic", 10, 1, 20).unwrap();
                let code = store.add_existing_module(&mut module).unwrap();
                assert_eq!(module.code(), Some(&code));
                assert_eq!(store.module(code.as_str()).unwrap().name(), "Logic");
                assert_eq!(
                    store.add_existing_module(&mut module).unwrap_err().kind(),
                    "id_already_set"
                );
            }

            it "rejects a deserialized module that claims teaching staff" {
                let mut module: Module = serde_json::from_value(serde_json::json!({
                    "code": null,
                    "name": "Logic",
                    "credits": 10,
                    "stage": 1,
                    "capacity": 5,
                    "enrolled": 0,
                    "discontinued": false,
                    "staff": [lecturer_id.as_str()],
                    "students": []
                }))
                .unwrap();

                let err = store.add_existing_module(&mut module).unwrap_err();
                assert_eq!(err.kind(), "staff_attached");
                assert_eq!(store.number_of_modules(), 0);
                assert!(store
                    .staff_member(lecturer_id.as_str())
                    .unwrap()
                    .teaching_modules()
                    .is_empty());
            }
        }

        describe "teaching assignment" {
            before {
                let code = store.add_module("Compilers", 20, 2, 30, &[]).unwrap();
            }

            it "assigns and unassigns staff" {
                store.assign_staff(code.as_str(), lecturer_id.as_str()).unwrap();
                assert!(store.module(code.as_str()).unwrap().teaching_staff().contains(&lecturer_id));

                store.unassign_staff(code.as_str(), lecturer_id.as_str()).unwrap();
                assert!(store.module(code.as_str()).unwrap().teaching_staff().is_empty());
                assert!(store
                    .staff_member(lecturer_id.as_str())
                    .unwrap()
                    .teaching_modules()
                    .is_empty());
            }

            it "rejects assigning the same staff twice" {
                store.assign_staff(code.as_str(), lecturer_id.as_str()).unwrap();
                let err = store.assign_staff(code.as_str(), lecturer_id.as_str()).unwrap_err();
                assert_eq!(err.kind(), "duplicate_staff");
            }

            it "rejects unassigning staff who do not teach the module" {
                let err = store.unassign_staff(code.as_str(), lecturer_id.as_str()).unwrap_err();
                assert_eq!(err.kind(), "staff_not_involved");
            }

            it "rejects assigning staff to a discontinued module" {
                store.discontinue(code.as_str()).unwrap();
                let err = store.assign_staff(code.as_str(), lecturer_id.as_str()).unwrap_err();
                assert_eq!(err.kind(), "module_discontinued");
            }
        }
    }

    describe "enrolment" {
        it "fills a module to capacity" {
            let module = store.add_module("Networks", 40, 2, 1, &[]).unwrap();
            let first = store.add_student("First", "Student", 2).unwrap();
            let second = store.add_student("Second", "Student", 2).unwrap();

            store.enrol(first.as_str(), module.as_str()).unwrap();
            assert_eq!(store.student(first.as_str()).unwrap().total_credits(), 40);
            assert!(store.module(module.as_str()).unwrap().is_at_capacity());
            assert_eq!(store.number_of_modules_at_capacity(), 1);

            let err = store.enrol(second.as_str(), module.as_str()).unwrap_err();
            assert_eq!(err.kind(), "module_at_capacity");
            assert_eq!(store.module(module.as_str()).unwrap().enrolled(), 1);
            assert_eq!(store.student(second.as_str()).unwrap().total_credits(), 0);
        }

        it "protects honours eligibility" {
            let module = store.add_module("Intro", 40, 1, 10, &[]).unwrap();
            let student = store.add_student("Late", "Starter", 3).unwrap();

            let err = store.enrol(student.as_str(), module.as_str()).unwrap_err();
            assert_eq!(err.kind(), "enrolling_would_prevent_honours");
            assert_eq!(store.student(student.as_str()).unwrap().total_credits(), 0);
        }

        it "allows up to 30 lower stage credits" {
            let a = store.add_module("Intro A", 20, 1, 10, &[]).unwrap();
            let b = store.add_module("Intro B", 10, 2, 10, &[]).unwrap();
            let c = store.add_module("Intro C", 10, 1, 10, &[]).unwrap();
            let student = store.add_student("Late", "Starter", 3).unwrap();

            store.enrol(student.as_str(), a.as_str()).unwrap();
            store.enrol(student.as_str(), b.as_str()).unwrap();
            assert_eq!(store.student(student.as_str()).unwrap().lower_stage_credits(), 30);

            let err = store.enrol(student.as_str(), c.as_str()).unwrap_err();
            assert_eq!(err.kind(), "enrolling_would_prevent_honours");
        }

        it "rejects modules above the student's stage" {
            let module = store.add_module("Advanced", 20, 4, 10, &[]).unwrap();
            let student = store.add_student("Fresh", "Er", 1).unwrap();
            let err = store.enrol(student.as_str(), module.as_str()).unwrap_err();
            assert_eq!(err.kind(), "module_stage_too_high");
        }

        it "caps a student at 120 credits" {
            let big = store.add_module("Project", 100, 2, 10, &[]).unwrap();
            let extra = store.add_module("Extra", 40, 2, 10, &[]).unwrap();
            let fill = store.add_module("Filler", 20, 2, 10, &[]).unwrap();
            let student = store.add_student("Busy", "Bee", 2).unwrap();

            store.enrol(student.as_str(), big.as_str()).unwrap();
            let err = store.enrol(student.as_str(), extra.as_str()).unwrap_err();
            assert_eq!(err.kind(), "insufficient_available_credits");

            store.enrol(student.as_str(), fill.as_str()).unwrap();
            assert!(store.student(student.as_str()).unwrap().is_fully_allocated());
            assert_eq!(store.number_of_fully_allocated_students(), 1);
        }

        it "rejects a second enrolment on the same module" {
            let module = store.add_module("Networks", 20, 2, 10, &[]).unwrap();
            let student = store.add_student("Ada", "Lovelace", 2).unwrap();

            store.enrol(student.as_str(), module.as_str()).unwrap();
            let err = store.enrol(student.as_str(), module.as_str()).unwrap_err();
            assert_eq!(err.kind(), "already_enrolled");
            assert_eq!(store.student(student.as_str()).unwrap().total_credits(), 20);
            assert_eq!(store.module(module.as_str()).unwrap().enrolled(), 1);
        }

        it "validates identifiers before looking them up" {
            let module = store.add_module("Networks", 20, 2, 10, &[]).unwrap();
            assert_eq!(
                store.enrol("not-an-id", module.as_str()).unwrap_err().kind(),
                "invalid_id"
            );
            assert_eq!(
                store.enrol("0000000001", module.as_str()).unwrap_err().kind(),
                "id_not_recognised"
            );
        }

        describe "un_enrol" {
            it "returns false for a pair that was never linked" {
                let module = store.add_module("Networks", 20, 2, 10, &[]).unwrap();
                let student = store.add_student("Ada", "Lovelace", 2).unwrap();
                assert!(!store.un_enrol(student.as_str(), module.as_str()).unwrap());
            }

            it "reverses the credit arithmetic" {
                let same = store.add_module("Networks", 20, 2, 10, &[]).unwrap();
                let lower = store.add_module("Intro", 10, 1, 10, &[]).unwrap();
                let student = store.add_student("Ada", "Lovelace", 2).unwrap();
                store.enrol(student.as_str(), same.as_str()).unwrap();
                store.enrol(student.as_str(), lower.as_str()).unwrap();

                assert!(store.un_enrol(student.as_str(), lower.as_str()).unwrap());
                let record = store.student(student.as_str()).unwrap();
                assert_eq!(record.lower_stage_credits(), 0);
                assert_eq!(record.same_stage_credits(), 20);
                assert_eq!(record.total_credits(), 20);
                assert_eq!(store.module(lower.as_str()).unwrap().enrolled(), 0);
                assert_consistent(&store);
            }
        }
    }

    describe "discontinue" {
        it "unlinks every student and staff member" {
            let lecturer = store.add_staff("Alan", "Turing").unwrap();
            let lecturer_record = store.staff_member(lecturer.as_str()).unwrap();
            let module = store.add_module("Networks", 20, 2, 10, &[lecturer_record]).unwrap();
            let a = store.add_student("A", "Student", 2).unwrap();
            let b = store.add_student("B", "Student", 3).unwrap();
            store.enrol(a.as_str(), module.as_str()).unwrap();
            store.enrol(b.as_str(), module.as_str()).unwrap();

            store.discontinue(module.as_str()).unwrap();

            let closed = store.module(module.as_str()).unwrap();
            assert!(closed.is_discontinued());
            assert_eq!(closed.enrolled(), 0);
            assert!(closed.students().is_empty());
            assert!(closed.teaching_staff().is_empty());
            assert_eq!(store.student(a.as_str()).unwrap().total_credits(), 0);
            assert_eq!(store.student(b.as_str()).unwrap().lower_stage_credits(), 0);
            assert!(!store.staff_member(lecturer.as_str()).unwrap().teaches(&module));

            let err = store.enrol(a.as_str(), module.as_str()).unwrap_err();
            assert_eq!(err.kind(), "module_discontinued");
            assert_consistent(&store);
        }

        it "is a no-op on an already discontinued module" {
            let module = store.add_module("Networks", 20, 2, 10, &[]).unwrap();
            store.discontinue(module.as_str()).unwrap();
            store.discontinue(module.as_str()).unwrap();
            assert!(store.module(module.as_str()).unwrap().is_discontinued());
        }

        it "removes the module from running and available views" {
            let open = store.add_module("Open", 20, 1, 1, &[]).unwrap();
            let full = store.add_module("Full", 20, 1, 1, &[]).unwrap();
            let closed = store.add_module("Closed", 20, 1, 1, &[]).unwrap();
            let student = store.add_student("A", "Student", 1).unwrap();
            store.enrol(student.as_str(), full.as_str()).unwrap();
            store.discontinue(closed.as_str()).unwrap();

            let running: Vec<_> = store.running_modules().iter().map(|m| m.code().unwrap().clone()).collect();
            let available: Vec<_> = store.available_modules().iter().map(|m| m.code().unwrap().clone()).collect();

            assert_eq!(store.modules().len(), 3);
            assert_eq!(running.len(), 2);
            assert!(!running.contains(&closed));
            assert_eq!(available, vec![open]);
        }
    }

    describe "removal" {
        it "removes a staff member and reports modules left unstaffed" {
            let alan = store.add_staff("Alan", "Turing").unwrap();
            let grace = store.add_staff("Grace", "Hopper").unwrap();
            let alan_record = store.staff_member(alan.as_str()).unwrap();
            let grace_record = store.staff_member(grace.as_str()).unwrap();
            let solo = store.add_module("Solo", 20, 1, 10, &[alan_record.clone()]).unwrap();
            let shared = store
                .add_module("Shared", 20, 1, 10, &[alan_record.clone(), grace_record])
                .unwrap();

            let unstaffed = store.remove_staff(&alan_record).unwrap();

            assert_eq!(unstaffed.len(), 1);
            assert_eq!(unstaffed[0].code(), Some(&solo));
            assert_eq!(store.number_of_staff(), 1);
            assert_eq!(store.staff_of(shared.as_str()).unwrap().len(), 1);
            assert_eq!(
                store.staff_member(alan.as_str()).unwrap_err().kind(),
                "id_not_recognised"
            );
            assert_consistent(&store);
        }

        it "removes a student from every module" {
            let a = store.add_module("A", 20, 1, 10, &[]).unwrap();
            let b = store.add_module("B", 20, 1, 10, &[]).unwrap();
            let id = store.add_student("Ada", "Lovelace", 1).unwrap();
            store.enrol(id.as_str(), a.as_str()).unwrap();
            store.enrol(id.as_str(), b.as_str()).unwrap();
            let record = store.student(id.as_str()).unwrap();

            store.remove_student(&record).unwrap();

            assert_eq!(store.number_of_students(), 0);
            assert_eq!(store.module(a.as_str()).unwrap().enrolled(), 0);
            assert!(store.students_of(b.as_str()).unwrap().is_empty());
            assert_eq!(
                store.remove_student(&record).unwrap_err().kind(),
                "id_not_recognised"
            );
        }

        it "requires an ID on the record" {
            let student = Student::new("No", "Id", 1).unwrap();
            assert_eq!(store.remove_student(&student).unwrap_err().kind(), "id_not_set");
            let staff = Staff::new("No", "Id");
            assert_eq!(store.remove_staff(&staff).unwrap_err().kind(), "id_not_set");
        }
    }

    describe "queries" {
        it "projects the modules of a student" {
            let a = store.add_module("A", 20, 1, 10, &[]).unwrap();
            store.add_module("B", 20, 1, 10, &[]).unwrap();
            let id = store.add_student("Ada", "Lovelace", 1).unwrap();
            store.enrol(id.as_str(), a.as_str()).unwrap();

            let modules = store.modules_of(id.as_str()).unwrap();
            assert_eq!(modules.len(), 1);
            assert_eq!(modules[0].code(), Some(&a));
            assert_eq!(store.students_of(a.as_str()).unwrap()[0].id(), Some(&id));
        }

        it "returns snapshots that later changes do not touch" {
            let module = store.add_module("A", 20, 1, 10, &[]).unwrap();
            let id = store.add_student("Ada", "Lovelace", 1).unwrap();
            let before = store.student(id.as_str()).unwrap();

            store.enrol(id.as_str(), module.as_str()).unwrap();

            assert_eq!(before.total_credits(), 0);
            assert_eq!(store.student(id.as_str()).unwrap().total_credits(), 20);
        }

        it "summarises the store" {
            let module = store.add_module("A", 120, 1, 1, &[]).unwrap();
            store.add_module("B", 20, 1, 10, &[]).unwrap();
            let closed = store.add_module("C", 20, 1, 10, &[]).unwrap();
            store.add_staff("Alan", "Turing").unwrap();
            let id = store.add_student("Ada", "Lovelace", 1).unwrap();
            store.enrol(id.as_str(), module.as_str()).unwrap();
            store.discontinue(closed.as_str()).unwrap();

            let stats = store.stats();
            assert_eq!(stats.students, 1);
            assert_eq!(stats.staff, 1);
            assert_eq!(stats.modules, 3);
            assert_eq!(stats.running_modules, 2);
            assert_eq!(stats.fully_allocated_students, 1);
            assert_eq!(stats.modules_at_capacity, 1);
        }
    }

    describe "invariants" {
        it "hold after a random sequence of operations" {
            let mut rng = StdRng::seed_from_u64(2024);
            let staff: Vec<StaffId> = (0..4)
                .map(|i| store.add_staff(format!("Staff{i}"), "Test").unwrap())
                .collect();
            let students: Vec<StudentId> = (0..12)
                .map(|i| store.add_student(format!("S{i}"), "Test", (i % 4 + 1) as u8).unwrap())
                .collect();
            let modules: Vec<ModuleCode> = (0..10)
                .map(|i| {
                    store
                        .add_module(
                            format!("M{i}"),
                            [0, 10, 20, 40][i % 4],
                            (i % 4 + 1) as u8,
                            (i % 3 + 1) as u32,
                            &[],
                        )
                        .unwrap()
                })
                .collect();

            for _ in 0..500 {
                let student = &students[rng.random_range(0..students.len())];
                let module = &modules[rng.random_range(0..modules.len())];
                match rng.random_range(0..10) {
                    0..=5 => {
                        let _ = store.enrol(student.as_str(), module.as_str());
                    }
                    6..=7 => {
                        store.un_enrol(student.as_str(), module.as_str()).unwrap();
                    }
                    8 => {
                        let member = &staff[rng.random_range(0..staff.len())];
                        let _ = store.assign_staff(module.as_str(), member.as_str());
                    }
                    _ => {
                        if rng.random_range(0..10) == 0 {
                            store.discontinue(module.as_str()).unwrap();
                        }
                    }
                }
                assert_consistent(&store);
            }
        }

        it "leave the store unchanged when an operation fails" {
            let module = store.add_module("Networks", 40, 2, 1, &[]).unwrap();
            let a = store.add_student("A", "Student", 2).unwrap();
            let b = store.add_student("B", "Student", 2).unwrap();
            store.enrol(a.as_str(), module.as_str()).unwrap();

            let students = store.students();
            let modules = store.modules();
            assert!(store.enrol(b.as_str(), module.as_str()).is_err());
            assert!(store.add_student("C", "Student", 0).is_err());
            assert!(store.add_module("Bad", 121, 1, 1, &[]).is_err());

            assert_eq!(store.students(), students);
            assert_eq!(store.modules(), modules);
        }
    }
}
