use crate::model::{Assignments, Role};
use crate::stats::Statistics;

pub fn display_details(a: &Assignments) {
    let mut projects = a.filter_projects(|p| a.is_open(p));
    projects.sort_by_key(|&p| a.project(p).label());
    for p in projects {
        let mut students = a.students_for(p).to_vec();
        students.sort_by_key(|&s| a.student(s).id);
        let project = a.project(p);
        println!("{} ({}/{}):", project.label(), students.len(), project.opt);
        for s in students {
            let student = a.student(s);
            print!("  - {}", student.id);
            if student.role == Role::Writing {
                print!(" (writing)");
            }
            if let Some(rank) = a.rank_of(s, p) {
                print!(" (rank {})", rank + 1);
            }
            if a.index().dislikes(s, p) {
                print!(" (disliked)");
            }
            println!();
        }
        println!();
    }
}

pub fn display_stats(stats: &Statistics) {
    println!(
        "Students assigned/unassigned/total: {}/{}/{}",
        stats.assigned, stats.unassigned, stats.students
    );
    println!(
        "Assignments preferred/neutral/disliked: {}/{}/{}",
        stats.preferred, stats.neutral, stats.disliked
    );
    let cumul = stats.ranks.iter().scan(0, |s, &r| {
        *s += r;
        Some(*s)
    });
    let total: usize = stats.ranks.iter().sum();
    if total > 0 {
        println!("Final ranking:");
        for (rank, (n, c)) in stats.ranks.iter().zip(cumul).enumerate() {
            if *n != 0 {
                println!(
                    "  - rank {}: {} (cumulative {} - {:.2}%)",
                    rank + 1,
                    n,
                    c,
                    100.0 * c as f32 / total as f32
                );
            }
        }
    }
    println!(
        "Covered projects: {}/{}",
        stats.covered_projects,
        stats.projects.iter().filter(|p| p.size > 0).count()
    );
    println!(
        "Total size deviation: {}, total role imbalance: {}",
        stats.total_deviation(),
        stats.total_role_imbalance()
    );
    println!(
        "Skill utilization: {}/{} ({:.2}%)",
        stats.skill_used,
        stats.skill_potential,
        100.0 * stats.utilization()
    );
}

pub fn display_empty(a: &Assignments) {
    let mut projects = a.filter_projects(|p| !a.is_open(p));
    projects.sort_by_key(|&p| a.project(p).label());
    if !projects.is_empty() {
        println!("Empty projects:");
        for p in projects {
            println!("  - {}", a.project(p).label());
        }
    }
}

pub fn display_unassigned(a: &Assignments) {
    let students = a.unassigned_students();
    if !students.is_empty() {
        println!("Unassigned students:");
        for s in students {
            println!("  - {}", a.student(s).id);
        }
    }
}
