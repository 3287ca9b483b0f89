//! Deterministic synthetic data for the social network tables.
//!
//! Rows reference each other by position in the generated vectors, because
//! database ids are only known once the referenced row has been inserted.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use social_common::config::AppConfig;
use social_common::types::NewUser;

const USERNAMES: &[&str] = &[
    "alice", "bob", "charlie", "dave", "eve", "frank", "grace", "heidi", "ivan", "judy", "karl",
    "laura", "mallory", "nina", "oscar", "peggy", "quinn", "rachel", "steve", "trent", "ursula",
    "victor", "wendy", "xander", "yvonne", "zack", "amber", "brian", "carol", "doug", "emma",
    "fiona", "george", "hannah", "ian", "jessica", "kevin", "lisa", "mike", "natalie", "oliver",
    "peter", "queen", "ron", "susan", "tim", "uma", "vicky", "walter",
];

const TITLES: &[&str] = &[
    "The Power of Habit",
    "Embracing Minimalism",
    "Healthy Eating Tips",
    "Travel on a Budget",
    "Mindfulness Meditation",
    "Boost Your Productivity",
    "Home Office Setup",
    "Digital Detox",
    "Gardening Basics",
    "DIY Home Projects",
    "Yoga for Beginners",
    "Sustainable Living",
    "Mastering Time Management",
    "Exploring Nature",
    "Simple Cooking Recipes",
    "Fitness at Home",
    "Personal Finance Tips",
    "Creative Writing",
    "Mental Health Awareness",
    "Learning New Skills",
];

const CONTENTS: &[&str] = &[
    "In this post, we'll explore how to develop good habits that stick and transform your life.",
    "Discover the benefits of a minimalist lifestyle and how to declutter your home and mind.",
    "Learn practical tips for eating healthy on a budget without sacrificing flavor.",
    "Traveling doesn't have to be expensive. Here are some tips for seeing the world on a budget.",
    "Mindfulness meditation can reduce stress and improve your mental well-being.",
    "Increase your productivity with these simple and effective strategies.",
    "Create the perfect home office setup to boost your work-from-home efficiency.",
    "A digital detox can help you reconnect with the real world and improve your mental health.",
    "Start your gardening journey with these basic tips for beginners.",
    "Transform your home with these fun and easy DIY projects.",
    "Yoga is a great way to stay fit and flexible. Here are some beginner-friendly poses.",
    "Sustainable living is good for you and the planet. Learn how to make eco-friendly choices.",
    "Master time management with these tips and get more done in less time.",
    "Nature has so much to offer. Discover the benefits of spending time outdoors.",
    "Whip up delicious meals with these simple and quick cooking recipes.",
    "Stay fit without leaving home with these effective at-home workout routines.",
    "Take control of your finances with these practical personal finance tips.",
    "Unleash your creativity with these inspiring writing prompts and exercises.",
    "Mental health is just as important as physical health. Learn how to take care of your mind.",
    "Learning new skills can be fun and rewarding. Here are some ideas to get you started.",
];

const TAGS: &[&str] = &[
    "Self Improvement",
    "Minimalism",
    "Health",
    "Travel",
    "Mindfulness",
    "Productivity",
    "Home Office",
    "Digital Detox",
    "Gardening",
    "DIY",
    "Yoga",
    "Sustainability",
    "Time Management",
    "Nature",
    "Cooking",
    "Fitness",
    "Personal Finance",
    "Writing",
    "Mental Health",
    "Learning",
];

const COMMENTS: &[&str] = &[
    "Great post! Thanks for sharing.",
    "I completely agree with your thoughts.",
    "Thanks for the tips, very helpful.",
    "Interesting perspective, I hadn't considered that.",
    "Thanks for sharing your experience.",
    "Well written, I enjoyed reading this.",
    "This is very insightful, thanks for posting.",
    "Great advice, I'll definitely try that.",
    "I love this, very inspirational.",
    "Thanks for the information, very useful.",
];

/// Number of tags attached to every generated post.
const TAGS_PER_POST: usize = 2;

/// Size and RNG seed of a synthetic data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedPlan {
    pub users: usize,
    pub posts: usize,
    pub comments: usize,
    pub follows: usize,
    pub rng_seed: u64,
}

impl SeedPlan {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            users: config.seed_users,
            posts: config.seed_posts,
            comments: config.seed_comments,
            follows: config.seed_follows,
            rng_seed: config.seed_rng,
        }
    }
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            users: 100,
            posts: 200,
            comments: 500,
            follows: 300,
            rng_seed: 42,
        }
    }
}

/// A post whose author is `users[author]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub author: usize,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// A comment on `posts[post]` by `users[author]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    pub post: usize,
    pub author: usize,
    pub content: String,
}

/// `users[follower]` follows `users[user]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FollowDraft {
    pub user: usize,
    pub follower: usize,
}

/// A complete synthetic data set, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedData {
    pub users: Vec<NewUser>,
    pub posts: Vec<PostDraft>,
    pub comments: Vec<CommentDraft>,
    pub follows: Vec<FollowDraft>,
}

impl SeedData {
    /// Username whose presence means the baseline has already been committed.
    pub fn marker_username(&self) -> Option<&str> {
        self.users.first().map(|user| user.username.as_str())
    }
}

/// Generate a data set. The same plan always yields the same rows.
pub fn generate(plan: &SeedPlan) -> SeedData {
    let mut rng = StdRng::seed_from_u64(plan.rng_seed);

    let users = generate_users(plan.users);
    let posts = generate_posts(&mut rng, plan.posts, users.len());
    let comments = generate_comments(&mut rng, plan.comments, users.len(), posts.len());
    let follows = generate_follows(&mut rng, plan.follows, users.len());

    SeedData {
        users,
        posts,
        comments,
        follows,
    }
}

fn generate_users(count: usize) -> Vec<NewUser> {
    (0..count)
        .map(|i| {
            let username = format!("{}{}", USERNAMES[i % USERNAMES.len()], i);
            NewUser {
                email: format!("{username}@example.com"),
                username,
            }
        })
        .collect()
}

fn generate_posts(rng: &mut StdRng, count: usize, users: usize) -> Vec<PostDraft> {
    if users == 0 {
        return Vec::new();
    }

    (0..count)
        .map(|_| PostDraft {
            author: rng.gen_range(0..users),
            title: pick(rng, TITLES).to_string(),
            content: pick(rng, CONTENTS).to_string(),
            tags: TAGS
                .choose_multiple(rng, TAGS_PER_POST)
                .map(|tag| tag.to_string())
                .collect(),
        })
        .collect()
}

fn generate_comments(
    rng: &mut StdRng,
    count: usize,
    users: usize,
    posts: usize,
) -> Vec<CommentDraft> {
    if users == 0 || posts == 0 {
        return Vec::new();
    }

    (0..count)
        .map(|_| CommentDraft {
            post: rng.gen_range(0..posts),
            author: rng.gen_range(0..users),
            content: pick(rng, COMMENTS).to_string(),
        })
        .collect()
}

/// Distinct edges, never a self-follow. Capped at the number of possible edges.
fn generate_follows(rng: &mut StdRng, count: usize, users: usize) -> Vec<FollowDraft> {
    let possible = users.saturating_mul(users.saturating_sub(1));
    let target = count.min(possible);

    let mut seen = HashSet::new();
    let mut follows = Vec::new();

    while follows.len() < target {
        let edge = FollowDraft {
            user: rng.gen_range(0..users),
            follower: rng.gen_range(0..users),
        };
        if edge.user != edge.follower && seen.insert(edge) {
            follows.push(edge);
        }
    }

    follows
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items[rng.gen_range(0..items.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_sizes() {
        let data = generate(&SeedPlan::default());
        assert_eq!(data.users.len(), 100);
        assert_eq!(data.posts.len(), 200);
        assert_eq!(data.comments.len(), 500);
        assert_eq!(data.follows.len(), 300);
    }

    #[test]
    fn test_same_seed_same_data() {
        let plan = SeedPlan::default();
        assert_eq!(generate(&plan), generate(&plan));

        let other = SeedPlan {
            rng_seed: 7,
            ..plan
        };
        assert_ne!(generate(&plan).posts, generate(&other).posts);
    }

    #[test]
    fn test_usernames_and_emails_are_unique() {
        let data = generate(&SeedPlan::default());
        let usernames: HashSet<_> = data.users.iter().map(|u| &u.username).collect();
        let emails: HashSet<_> = data.users.iter().map(|u| &u.email).collect();
        assert_eq!(usernames.len(), data.users.len());
        assert_eq!(emails.len(), data.users.len());
        assert_eq!(data.users[0].username, "alice0");
        assert_eq!(data.users[0].email, "alice0@example.com");
        assert_eq!(data.marker_username(), Some("alice0"));
    }

    #[test]
    fn test_references_point_at_generated_rows() {
        let data = generate(&SeedPlan::default());
        assert!(data.posts.iter().all(|p| p.author < data.users.len()));
        assert!(
            data.comments
                .iter()
                .all(|c| c.post < data.posts.len() && c.author < data.users.len())
        );
        assert!(data.posts.iter().all(|p| {
            p.tags.len() == TAGS_PER_POST && p.tags[0] != p.tags[1]
        }));
    }

    #[test]
    fn test_follows_are_distinct_and_never_self() {
        let data = generate(&SeedPlan::default());
        let distinct: HashSet<_> = data.follows.iter().collect();
        assert_eq!(distinct.len(), data.follows.len());
        assert!(data.follows.iter().all(|f| f.user != f.follower));
    }

    #[test]
    fn test_follows_capped_by_possible_edges() {
        let plan = SeedPlan {
            users: 3,
            follows: 100,
            ..SeedPlan::default()
        };
        assert_eq!(generate(&plan).follows.len(), 6);
    }

    #[test]
    fn test_huge_follow_request_with_few_users() {
        let plan = SeedPlan {
            users: 4,
            follows: usize::MAX,
            ..SeedPlan::default()
        };
        assert_eq!(generate(&plan).follows.len(), 12);
    }

    #[test]
    fn test_no_users_means_no_dependents() {
        let plan = SeedPlan {
            users: 0,
            ..SeedPlan::default()
        };
        let data = generate(&plan);
        assert!(data.users.is_empty());
        assert!(data.posts.is_empty());
        assert!(data.comments.is_empty());
        assert!(data.follows.is_empty());
        assert_eq!(data.marker_username(), None);
    }
}
